//! Color operators.
//!
//! Handles: CS, cs, SC, SCN, sc, scn, G, g, RG, rg, K, k
//!
//! - CS/cs: Select a color space, resetting the color to its initial value
//! - SC/SCN/sc/scn: Set color in the current color space
//! - G/g, RG/rg, K/k: Select a device space and set the color in one step
//!
//! Uppercase operators affect stroking, lowercase non-stroking.

use std::sync::Arc;

use smallvec::smallvec;

use crate::error::{PdfError, Result};
use crate::interp::device::LetterSource;
use crate::interp::interpreter::PDFPageInterpreter;
use crate::model::color::{Color, RgbColor};
use crate::model::colorspace::{ColorSpace, Components};
use crate::model::state::ColorState;
use crate::parser::PSToken;

/// Last `n` numbers of an operand list.
fn take_components(numbers: &[f64], n: usize) -> Result<Components> {
    if numbers.len() < n {
        return Err(PdfError::SyntaxError(format!(
            "expected {n} color components, got {}",
            numbers.len()
        )));
    }
    Ok(numbers[numbers.len() - n..].iter().copied().collect())
}

/// Color for `components`, black when the conversion fails.
fn convert(space: &ColorSpace, components: &[f64]) -> Color {
    space.to_color(components).unwrap_or_else(|err| {
        tracing::warn!(space = %space, error = %err, "color conversion failed, using black");
        Color::from(RgbColor::BLACK)
    })
}

#[allow(non_snake_case)]
impl<L: LetterSource> PDFPageInterpreter<'_, L> {
    fn color_state(&mut self, stroking: bool) -> &mut ColorState {
        if stroking {
            &mut self.graphicstate.stroke
        } else {
            &mut self.graphicstate.fill
        }
    }

    fn select_colorspace(&mut self, stroking: bool, name: &str) -> Result<()> {
        let space = self.resources.resolve_colorspace(name, self.resolver)?;
        *self.color_state(stroking) = ColorState::new(space);
        Ok(())
    }

    fn set_device_color(&mut self, stroking: bool, space: ColorSpace, components: Components) {
        let color = convert(&space, &components);
        *self.color_state(stroking) = ColorState {
            space: Arc::new(space),
            components,
            color,
        };
    }

    /// Shared body of SC/SCN/sc/scn.
    fn set_color(&mut self, stroking: bool, mut args: Vec<PSToken>) -> Result<()> {
        let space = Arc::clone(&self.color_state(stroking).space);
        let pattern = match args.last() {
            Some(PSToken::Literal(_)) => Some(Self::pop_name(&mut args)?),
            _ => None,
        };
        let numbers: Vec<f64> = args.iter().filter_map(PSToken::as_num).collect();

        let (components, color) = match (&*space, pattern) {
            (ColorSpace::Pattern { underlying: None }, Some(name)) => {
                (Components::new(), Color::PatternColored(name))
            }
            (ColorSpace::Pattern { underlying: Some(base) }, Some(name)) => {
                let components = take_components(&numbers, base.ncomponents())?;
                let base_color = convert(base, &components);
                (components, Color::PatternUncolored(Box::new(base_color), name))
            }
            (ColorSpace::Pattern { .. }, None) => {
                return Err(PdfError::InvalidArgument(
                    "pattern color space needs a pattern name".into(),
                ));
            }
            (_, Some(name)) => {
                return Err(PdfError::InvalidArgument(format!(
                    "pattern /{name} given for {space} color space"
                )));
            }
            (space, None) => {
                let components = take_components(&numbers, space.ncomponents())?;
                let color = convert(space, &components);
                (components, color)
            }
        };
        let state = self.color_state(stroking);
        state.components = components;
        state.color = color;
        Ok(())
    }

    /// PDF operator: `CS`
    pub fn do_CS(&mut self, name: &str) -> Result<()> {
        self.select_colorspace(true, name)
    }

    /// PDF operator: `cs`
    pub fn do_cs(&mut self, name: &str) -> Result<()> {
        self.select_colorspace(false, name)
    }

    /// Sets the stroking color. Operands are components, optionally
    /// followed by a pattern name.
    ///
    /// PDF operators: `SC`, `SCN`
    pub fn do_SCN(&mut self, args: Vec<PSToken>) -> Result<()> {
        self.set_color(true, args)
    }

    /// PDF operators: `sc`, `scn`
    pub fn do_scn(&mut self, args: Vec<PSToken>) -> Result<()> {
        self.set_color(false, args)
    }

    /// PDF operator: `G`
    pub fn do_G(&mut self, gray: f64) -> Result<()> {
        self.set_device_color(true, ColorSpace::DeviceGray, smallvec![gray]);
        Ok(())
    }

    /// PDF operator: `g`
    pub fn do_g(&mut self, gray: f64) -> Result<()> {
        self.set_device_color(false, ColorSpace::DeviceGray, smallvec![gray]);
        Ok(())
    }

    /// PDF operator: `RG`
    pub fn do_RG(&mut self, r: f64, g: f64, b: f64) -> Result<()> {
        self.set_device_color(true, ColorSpace::DeviceRGB, smallvec![r, g, b]);
        Ok(())
    }

    /// PDF operator: `rg`
    pub fn do_rg(&mut self, r: f64, g: f64, b: f64) -> Result<()> {
        self.set_device_color(false, ColorSpace::DeviceRGB, smallvec![r, g, b]);
        Ok(())
    }

    /// PDF operator: `K`
    pub fn do_K(&mut self, c: f64, m: f64, y: f64, k: f64) -> Result<()> {
        self.set_device_color(true, ColorSpace::DeviceCMYK, smallvec![c, m, y, k]);
        Ok(())
    }

    /// PDF operator: `k`
    pub fn do_k(&mut self, c: f64, m: f64, y: f64, k: f64) -> Result<()> {
        self.set_device_color(false, ColorSpace::DeviceCMYK, smallvec![c, m, y, k]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::interp::interpreter::PDFPageInterpreter;
    use crate::interp::params::InterpreterOptions;
    use crate::model::color::Color;
    use crate::model::colorspace::ColorSpace;
    use crate::model::objects::{NoResolver, PDFDict, PDFObject};

    #[test]
    fn test_cs_resets_to_initial_color() {
        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        interp.execute(&[b"0.2 0.3 0.4 rg /DeviceCMYK cs".as_slice()]).unwrap();
        let fill = &interp.graphicstate().fill;
        assert_eq!(*fill.space, ColorSpace::DeviceCMYK);
        assert_eq!(fill.color, Color::Cmyk(0.0, 0.0, 0.0, 1.0));
        assert_eq!(interp.graphicstate().stroke.color, Color::Gray(0.0));
    }

    #[test]
    fn test_scn_pattern_name() {
        let mut cs = PDFDict::new();
        cs.insert(
            "P0".into(),
            PDFObject::Array(vec![PDFObject::Name("Pattern".into()), PDFObject::Name("DeviceGray".into())]),
        );
        let mut res = PDFDict::new();
        res.insert("ColorSpace".into(), PDFObject::Dict(cs));

        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        interp
            .with_resources(Some(&res), |i| i.execute(&[b"/P0 CS 0.5 /Hatch SCN".as_slice()]))
            .unwrap();
        assert_eq!(
            interp.graphicstate().stroke.color,
            Color::PatternUncolored(Box::new(Color::Gray(0.5)), "Hatch".into())
        );
    }

    #[test]
    fn test_too_few_components() {
        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        assert!(interp.execute(&[b"/DeviceRGB cs 0.1 sc".as_slice()]).is_err());
    }
}
