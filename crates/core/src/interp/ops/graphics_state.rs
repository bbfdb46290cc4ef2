//! Graphics state operators.
//!
//! Handles: q, Q, cm, w, J, j, M, d, ri, i, gs
//!
//! - q/Q: Push/pop graphics state
//! - cm: Concatenate transformation matrix
//! - w, J, j, M, d: Line styling (width, cap, join, miter limit, dash)
//! - ri, i: Rendering intent and flatness
//! - gs: Set parameters from an ExtGState dictionary

use crate::error::{PdfError, Result};
use crate::interp::device::LetterSource;
use crate::interp::interpreter::PDFPageInterpreter;
use crate::interp::resources::ResourceKind;
use crate::model::objects::{PDFObject, resolve_object};
use crate::model::path::{DashPattern, LineCap, LineJoin};
use crate::utils::mult_matrix;

#[allow(non_snake_case)]
impl<L: LetterSource> PDFPageInterpreter<'_, L> {
    /// Saves the current graphics state to the stack.
    ///
    /// PDF operator: `q`
    pub fn do_q(&mut self) -> Result<()> {
        self.gstack.push(self.get_current_state());
        Ok(())
    }

    /// Restores the graphics state from the stack.
    ///
    /// PDF operator: `Q`
    pub fn do_Q(&mut self) -> Result<()> {
        match self.gstack.pop() {
            Some(state) => {
                self.set_current_state(state);
                Ok(())
            }
            None => Err(PdfError::InvalidArgument("Q without matching q".into())),
        }
    }

    /// Concatenates a matrix to the current transformation matrix.
    ///
    /// PDF operator: `cm`
    pub fn do_cm(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.ctm = mult_matrix((a, b, c, d, e, f), self.ctm);
    }

    /// Sets the line width in user space.
    ///
    /// PDF operator: `w`
    pub fn do_w(&mut self, linewidth: f64) -> Result<()> {
        if linewidth < 0.0 {
            return Err(PdfError::InvalidArgument(format!("negative line width {linewidth}")));
        }
        self.graphicstate.linewidth = linewidth;
        Ok(())
    }

    /// PDF operator: `J`
    pub fn do_J(&mut self, linecap: i64) -> Result<()> {
        self.graphicstate.linecap = LineCap::from_int(linecap)
            .ok_or_else(|| PdfError::InvalidArgument(format!("line cap {linecap}")))?;
        Ok(())
    }

    /// PDF operator: `j`
    pub fn do_j(&mut self, linejoin: i64) -> Result<()> {
        self.graphicstate.linejoin = LineJoin::from_int(linejoin)
            .ok_or_else(|| PdfError::InvalidArgument(format!("line join {linejoin}")))?;
        Ok(())
    }

    /// PDF operator: `M`
    pub fn do_M(&mut self, miterlimit: f64) -> Result<()> {
        self.graphicstate.miterlimit = miterlimit;
        Ok(())
    }

    /// Sets the line dash pattern. An empty array means a solid line.
    ///
    /// PDF operator: `d`
    pub fn do_d(&mut self, dash_array: Vec<f64>, phase: f64) -> Result<()> {
        if dash_array.iter().any(|&v| v < 0.0) {
            return Err(PdfError::InvalidArgument("negative dash length".into()));
        }
        let dash = DashPattern::new(dash_array, phase);
        self.graphicstate.dash = (!dash.is_solid()).then_some(dash);
        Ok(())
    }

    /// PDF operator: `ri`
    pub fn do_ri(&mut self, intent: &str) {
        self.graphicstate.intent = Some(intent.to_string());
    }

    /// PDF operator: `i`
    pub fn do_i(&mut self, flatness: f64) -> Result<()> {
        self.graphicstate.flatness = flatness.clamp(0.0, 100.0);
        Ok(())
    }

    /// Sets parameters from a graphics state parameter dictionary.
    ///
    /// Applies LW, LC, LJ, ML, D, RI, FL, Font, CA, ca and SMask; other
    /// entries (blend modes, transfer functions, halftones) are ignored.
    ///
    /// PDF operator: `gs`
    pub fn do_gs(&mut self, name: &str) -> Result<()> {
        let resolver = self.resolver;
        let dict = self
            .resources
            .dict(ResourceKind::ExtGState, name, resolver)?
            .ok_or_else(|| PdfError::KeyError(format!("ExtGState /{name}")))?;

        let mut keys: Vec<&String> = dict.keys().collect();
        keys.sort();
        for key in keys {
            let value = resolve_object(resolver, &dict[key])?;
            match key.as_str() {
                "LW" => self.do_w(value.as_num()?)?,
                "LC" => self.do_J(value.as_int()?)?,
                "LJ" => self.do_j(value.as_int()?)?,
                "ML" => self.do_M(value.as_num()?)?,
                "D" => {
                    let parts = value.as_array()?;
                    let [array, phase] = parts.as_slice() else {
                        return Err(PdfError::format("ExtGState /D is not [array phase]"));
                    };
                    let array = resolve_object(resolver, array)?.as_num_array()?;
                    let phase = resolve_object(resolver, phase)?.as_num()?;
                    self.do_d(array, phase)?;
                }
                "RI" => self.do_ri(value.as_name()?),
                "FL" => self.do_i(value.as_num()?)?,
                "Font" => {
                    let parts = value.as_array()?;
                    let [font, size] = parts.as_slice() else {
                        return Err(PdfError::format("ExtGState /Font is not [font size]"));
                    };
                    let objref = *font.as_ref()?;
                    let size = resolve_object(resolver, size)?.as_num()?;
                    let font = self.resources.font_by_reference(objref, resolver)?;
                    self.textstate.fontname = font.base_font().map(str::to_string);
                    self.textstate.font = Some(font);
                    self.textstate.fontsize = size;
                }
                "CA" => self.graphicstate.stroke_alpha = value.as_num()?.clamp(0.0, 1.0),
                "ca" => self.graphicstate.fill_alpha = value.as_num()?.clamp(0.0, 1.0),
                "SMask" => {
                    self.graphicstate.soft_mask = !matches!(&value, PDFObject::Name(n) if n == "None");
                }
                other => tracing::trace!(key = other, "ignoring ExtGState entry"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::PdfError;
    use crate::interp::interpreter::PDFPageInterpreter;
    use crate::interp::params::InterpreterOptions;
    use crate::model::objects::{NoResolver, PDFDict, PDFObject};
    use crate::model::path::LineCap;

    #[test]
    fn test_q_restores_ctm_and_width() {
        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        interp
            .execute(&[b"q 2 0 0 2 10 10 cm 5 w Q".as_slice()])
            .unwrap();
        assert_eq!(interp.ctm(), (1.0, 0.0, 0.0, 1.0, 0.0, 0.0));
        assert_eq!(interp.graphicstate().linewidth, 1.0);
    }

    #[test]
    fn test_unbalanced_restore() {
        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        let err = interp.execute(&[b"Q".as_slice()]).unwrap_err();
        assert!(matches!(err, PdfError::InvalidArgument(_)));
    }

    #[test]
    fn test_gs_applies_line_params() {
        let mut gs = PDFDict::new();
        gs.insert("LW".into(), PDFObject::Int(3));
        gs.insert("LC".into(), PDFObject::Int(1));
        gs.insert("ca".into(), PDFObject::Real(0.5));
        gs.insert("SMask".into(), PDFObject::Name("None".into()));
        let mut table = PDFDict::new();
        table.insert("GS0".into(), PDFObject::Dict(gs));
        let mut res = PDFDict::new();
        res.insert("ExtGState".into(), PDFObject::Dict(table));

        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        interp
            .with_resources(Some(&res), |i| i.execute(&[b"/GS0 gs".as_slice()]))
            .unwrap();
        let gs = interp.graphicstate();
        assert_eq!(gs.linewidth, 3.0);
        assert_eq!(gs.linecap, LineCap::Round);
        assert_eq!(gs.fill_alpha, 0.5);
        assert!(!gs.soft_mask);
    }
}
