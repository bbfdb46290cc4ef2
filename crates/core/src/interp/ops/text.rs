//! Text operators.
//!
//! Handles: BT, ET, Tc, Tw, Tz, TL, Tf, Tr, Ts, Td, TD, Tm, T*, Tj, TJ, ', "
//!
//! Text object:
//! - BT/ET: Begin/end text object
//!
//! Text state:
//! - Tc: Character spacing
//! - Tw: Word spacing
//! - Tz: Horizontal scaling
//! - TL: Leading
//! - Tf: Font and size
//! - Tr: Rendering mode
//! - Ts: Rise (baseline offset)
//!
//! Text positioning:
//! - Td/TD: Move to next line (TD also sets leading)
//! - Tm: Set text matrix directly
//! - T*: Move to next line using current leading
//!
//! Text showing:
//! - Tj: Show string
//! - TJ: Show with individual glyph positioning
//! - ': Move to next line and show
//! - ": Set spacing, move to next line, and show
//!
//! Glyph placement is delegated to the interpreter's [`LetterSource`].

use crate::error::{PdfError, Result};
use crate::interp::device::{LetterSource, TextRun, TextSeq, TextSeqItem};
use crate::interp::interpreter::PDFPageInterpreter;
use crate::utils::{MATRIX_IDENTITY, mult_matrix, translate_matrix};

#[allow(non_snake_case)]
impl<L: LetterSource> PDFPageInterpreter<'_, L> {
    // ========================================================================
    // Text Object Operators
    // ========================================================================

    /// BT - Begin text object.
    ///
    /// Resets the text matrix and text line matrix to identity.
    pub fn do_BT(&mut self) {
        if self.in_text {
            tracing::debug!("BT inside a text object");
        }
        self.in_text = true;
        self.textstate.reset();
    }

    /// ET - End text object.
    pub fn do_ET(&mut self) {
        self.in_text = false;
        self.textstate.matrix = MATRIX_IDENTITY;
        self.textstate.linematrix = MATRIX_IDENTITY;
    }

    // ========================================================================
    // Text State Operators
    // ========================================================================

    /// Tc - Set character spacing.
    pub const fn do_Tc(&mut self, charspace: f64) {
        self.textstate.charspace = charspace;
    }

    /// Tw - Set word spacing.
    pub const fn do_Tw(&mut self, wordspace: f64) {
        self.textstate.wordspace = wordspace;
    }

    /// Tz - Set horizontal scaling, a percentage.
    pub const fn do_Tz(&mut self, scaling: f64) {
        self.textstate.scaling = scaling;
    }

    /// TL - Set text leading.
    pub const fn do_TL(&mut self, leading: f64) {
        self.textstate.leading = leading;
    }

    /// Tf - Set text font and size.
    ///
    /// Size and name are set even when the font resource is missing, so
    /// later positioning stays consistent.
    pub fn do_Tf(&mut self, fontid: &str, fontsize: f64) -> Result<()> {
        self.textstate.fontsize = fontsize;
        self.textstate.fontname = Some(fontid.to_string());
        self.textstate.font = self.resources.font(fontid, self.resolver)?;
        if self.textstate.font.is_none() {
            return Err(PdfError::KeyError(format!("Font /{fontid}")));
        }
        Ok(())
    }

    /// Tr - Set text rendering mode.
    ///
    /// 0=fill, 1=stroke, 2=fill+stroke, 3=invisible; 4-7 add clipping to
    /// modes 0-3.
    pub fn do_Tr(&mut self, render: i64) -> Result<()> {
        if !(0..=7).contains(&render) {
            return Err(PdfError::InvalidArgument(format!("text render mode {render}")));
        }
        self.textstate.render = render as i32;
        Ok(())
    }

    /// Ts - Set text rise.
    pub const fn do_Ts(&mut self, rise: f64) {
        self.textstate.rise = rise;
    }

    // ========================================================================
    // Text Positioning Operators
    // ========================================================================

    /// Td - Move to the start of the next line, offset from the start of
    /// the current line by (tx, ty).
    pub fn do_Td(&mut self, tx: f64, ty: f64) {
        let line = translate_matrix(self.textstate.linematrix, (tx, ty));
        self.textstate.linematrix = line;
        self.textstate.matrix = line;
    }

    /// TD - Same as Td, and sets the leading to -ty.
    pub fn do_TD(&mut self, tx: f64, ty: f64) {
        self.textstate.leading = -ty;
        self.do_Td(tx, ty);
    }

    /// Tm - Set text matrix and text line matrix.
    pub const fn do_Tm(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.textstate.matrix = (a, b, c, d, e, f);
        self.textstate.linematrix = (a, b, c, d, e, f);
    }

    /// T* - Move to the start of the next line. Same as `0 -TL Td`.
    pub fn do_T_star(&mut self) {
        self.do_Td(0.0, -self.textstate.leading);
    }

    // ========================================================================
    // Text Showing Operators
    // ========================================================================

    /// Hand one string to the letter source and advance the text matrix.
    fn show_string(&mut self, bytes: &[u8]) {
        if !self.in_text {
            tracing::debug!("text shown outside BT/ET");
        }
        let color = match self.textstate.render {
            0 | 2 | 4 | 6 => Some(&self.graphicstate.fill.color),
            1 | 5 => Some(&self.graphicstate.stroke.color),
            _ => None,
        };
        let run = TextRun {
            font: self.textstate.font.as_deref(),
            bytes,
            state: &self.textstate,
            matrix: mult_matrix(self.textstate.matrix, self.ctm),
            color,
            resolver: self.resolver,
        };
        let shown = self.letters.show_text(&run);
        self.textstate.matrix = translate_matrix(self.textstate.matrix, (shown.advance, 0.0));
        self.emit_letters(shown.letters);
    }

    /// TJ - Show strings with individual glyph positioning.
    ///
    /// Numbers are adjustments in thousandths of a text space unit,
    /// subtracted from the horizontal position.
    pub fn do_TJ(&mut self, seq: &TextSeq) {
        for item in seq {
            match item {
                TextSeqItem::Bytes(bytes) => self.show_string(bytes),
                TextSeqItem::Number(n) => {
                    let ts = &self.textstate;
                    let shift = -n * 0.001 * ts.fontsize * ts.scaling * 0.01;
                    self.textstate.matrix = translate_matrix(ts.matrix, (shift, 0.0));
                }
            }
        }
    }

    /// Tj - Show text string.
    pub fn do_Tj(&mut self, s: &[u8]) {
        self.show_string(s);
    }

    /// ' (quote) - Move to next line and show text.
    pub fn do_quote(&mut self, s: &[u8]) {
        self.do_T_star();
        self.show_string(s);
    }

    /// " (doublequote) - Set word and character spacing, move to next
    /// line, and show text.
    pub fn do_doublequote(&mut self, aw: f64, ac: f64, s: &[u8]) {
        self.do_Tw(aw);
        self.do_Tc(ac);
        self.do_quote(s);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::error::PdfError;
    use crate::interp::device::WidthsLetterSource;
    use crate::interp::interpreter::PDFPageInterpreter;
    use crate::interp::params::InterpreterOptions;
    use crate::interp::resources::PDFResourceManager;
    use crate::model::color::Color;
    use crate::model::objects::{NoResolver, PDFDict, PDFObject};

    fn font_resources() -> PDFDict {
        let mut font = PDFDict::new();
        font.insert("Type".into(), PDFObject::Name("Font".into()));
        font.insert("BaseFont".into(), PDFObject::Name("Mono".into()));
        font.insert("FirstChar".into(), PDFObject::Int(32));
        font.insert(
            "Widths".into(),
            PDFObject::Array((32..128).map(|_| PDFObject::Int(500)).collect()),
        );
        let mut fonts = PDFDict::new();
        fonts.insert("F1".into(), PDFObject::Dict(font));
        let mut res = PDFDict::new();
        res.insert("Font".into(), PDFObject::Dict(fonts));
        res
    }

    #[test]
    fn test_td_moves_line_matrix() {
        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        interp
            .execute(&[b"BT 10 20 Td 5 5 Td 14 TL T*".as_slice()])
            .unwrap();
        let ts = interp.textstate();
        assert_eq!(ts.linematrix, (1.0, 0.0, 0.0, 1.0, 15.0, 11.0));
        assert_eq!(ts.matrix, ts.linematrix);
    }

    #[test]
    fn test_td_sets_leading() {
        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        interp.execute(&[b"BT 0 -12 TD".as_slice()]).unwrap();
        assert_eq!(interp.textstate().leading, 12.0);
    }

    #[test]
    fn test_bad_render_mode() {
        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        let err = interp.execute(&[b"9 Tr".as_slice()]).unwrap_err();
        assert!(matches!(err, PdfError::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_font_is_key_error() {
        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        let err = interp.execute(&[b"/F9 12 Tf".as_slice()]).unwrap_err();
        assert!(matches!(err, PdfError::KeyError(_)));
        assert_eq!(interp.textstate().fontsize, 12.0);
    }

    #[test]
    fn test_tj_places_letters_and_advances() {
        let manager = Arc::new(PDFResourceManager::new());
        let mut letters = WidthsLetterSource::new();
        let mut interp = PDFPageInterpreter::with_letter_source(
            &NoResolver,
            manager,
            &mut letters,
            InterpreterOptions::strict(),
        );
        let res = font_resources();
        interp
            .with_resources(Some(&res), |i| {
                i.execute(&[b"0 0 1 rg BT /F1 10 Tf 100 700 Td (Hi) Tj [(A) -1000 (B)] TJ ET"
                    .as_slice()])
            })
            .unwrap();
        let out = interp.finish();
        assert_eq!(out.text(), "HiAB");
        assert_eq!(out.letters[0].origin, (100.0, 700.0));
        assert_eq!(out.letters[2].origin, (110.0, 700.0));
        // 5 for the glyph plus 10 from the TJ adjustment
        assert_eq!(out.letters[3].origin, (125.0, 700.0));
        assert_eq!(out.letters[0].color, Some(Color::Rgb(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_invisible_text_has_no_color() {
        let manager = Arc::new(PDFResourceManager::new());
        let mut interp = PDFPageInterpreter::with_letter_source(
            &NoResolver,
            manager,
            WidthsLetterSource::new(),
            InterpreterOptions::strict(),
        );
        let res = font_resources();
        interp
            .with_resources(Some(&res), |i| i.execute(&[b"BT /F1 1 Tf 3 Tr (x) Tj ET".as_slice()]))
            .unwrap();
        let out = interp.finish();
        assert_eq!(out.letters.len(), 1);
        assert_eq!(out.letters[0].color, None);
    }
}
