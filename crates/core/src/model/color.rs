//! Color values carried by paths, letters and the graphics state.

/// A device RGB color with components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RgbColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl RgbColor {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Builds a color, clamping every component into [0, 1].
    pub fn clamped(r: f64, g: f64, b: f64) -> Self {
        Self::new(clamp_unit(r), clamp_unit(g), clamp_unit(b))
    }

    pub const fn gray(level: f64) -> Self {
        Self::new(level, level, level)
    }

    /// Components as 8-bit values.
    pub fn to_bytes(&self) -> [u8; 3] {
        [
            (clamp_unit(self.r) * 255.0).round() as u8,
            (clamp_unit(self.g) * 255.0).round() as u8,
            (clamp_unit(self.b) * 255.0).round() as u8,
        ]
    }
}

#[inline]
pub(crate) fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Color value as set by the content stream.
///
/// Device colors keep their original components; colors from CIE-based,
/// indexed and special spaces are stored already converted to RGB.
#[derive(Debug, Clone, PartialEq)]
pub enum Color {
    /// Greyscale color (0.0 = black, 1.0 = white)
    Gray(f64),
    /// RGB color
    Rgb(f64, f64, f64),
    /// CMYK color
    Cmyk(f64, f64, f64, f64),
    /// Colored tiling pattern or shading pattern - just the pattern name
    PatternColored(String),
    /// Uncolored tiling pattern - base color + pattern name
    PatternUncolored(Box<Color>, String),
}

impl Default for Color {
    fn default() -> Self {
        Color::Gray(0.0)
    }
}

impl From<RgbColor> for Color {
    fn from(c: RgbColor) -> Self {
        Color::Rgb(c.r, c.g, c.b)
    }
}

impl Color {
    /// Numeric components.
    ///
    /// PatternColored has no components; PatternUncolored returns the
    /// base color's components.
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Color::Gray(g) => vec![*g],
            Color::Rgb(r, g, b) => vec![*r, *g, *b],
            Color::Cmyk(c, m, y, k) => vec![*c, *m, *y, *k],
            Color::PatternColored(_) => vec![],
            Color::PatternUncolored(base, _) => base.to_vec(),
        }
    }

    /// Device RGB equivalent. Colored patterns have none.
    pub fn to_rgb(&self) -> Option<RgbColor> {
        match self {
            Color::Gray(g) => Some(RgbColor::gray(clamp_unit(*g))),
            Color::Rgb(r, g, b) => Some(RgbColor::clamped(*r, *g, *b)),
            Color::Cmyk(c, m, y, k) => Some(cmyk_to_rgb(*c, *m, *y, *k)),
            Color::PatternColored(_) => None,
            Color::PatternUncolored(base, _) => base.to_rgb(),
        }
    }

    /// Pattern name for pattern colors.
    pub fn pattern_name(&self) -> Option<&str> {
        match self {
            Color::PatternColored(name) => Some(name),
            Color::PatternUncolored(_, name) => Some(name),
            _ => None,
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            Color::PatternColored(_) | Color::PatternUncolored(_, _)
        )
    }
}

/// Naive CMYK to RGB conversion.
pub fn cmyk_to_rgb(c: f64, m: f64, y: f64, k: f64) -> RgbColor {
    let k = clamp_unit(k);
    RgbColor::new(
        (1.0 - clamp_unit(c)) * (1.0 - k),
        (1.0 - clamp_unit(m)) * (1.0 - k),
        (1.0 - clamp_unit(y)) * (1.0 - k),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmyk_black_and_white() {
        assert_eq!(cmyk_to_rgb(0.0, 0.0, 0.0, 1.0), RgbColor::BLACK);
        assert_eq!(cmyk_to_rgb(0.0, 0.0, 0.0, 0.0), RgbColor::WHITE);
    }

    #[test]
    fn test_pattern_uncolored_uses_base() {
        let color = Color::PatternUncolored(Box::new(Color::Gray(0.5)), "P0".into());
        assert_eq!(color.to_vec(), vec![0.5]);
        assert_eq!(color.pattern_name(), Some("P0"));
        assert_eq!(color.to_rgb(), Some(RgbColor::gray(0.5)));
    }

    #[test]
    fn test_to_bytes() {
        assert_eq!(RgbColor::new(1.0, 0.5, 0.0).to_bytes(), [255, 128, 0]);
    }
}
