//! Letter sources - the text output seam of the interpreter.
//!
//! Font programs are outside this crate. When a text-showing operator runs,
//! the interpreter hands each string to a [`LetterSource`], which turns the
//! bytes into placed [`Letter`]s and reports how far the text matrix moves.
//! [`NoLetters`] drops text entirely; [`WidthsLetterSource`] places one glyph
//! per byte using the font dictionary's `/Widths`, which is enough for simple
//! fonts.

use crate::interp::resources::FontResource;
use crate::model::color::Color;
use crate::model::content::Letter;
use crate::model::objects::{ObjectResolver, PDFDict, PDFObject, resolve_object};
use crate::model::state::PDFTextState;
use crate::utils::{Matrix, apply_matrix_norm, apply_matrix_pt, apply_matrix_rect, matrix_scale};

/// Width used for codes outside `/Widths` when no `/MissingWidth` is given.
const DEFAULT_GLYPH_WIDTH: f64 = 500.0;

/// Item of a `TJ` array.
#[derive(Debug, Clone, PartialEq)]
pub enum TextSeqItem {
    /// Adjustment in thousandths of text space, subtracted from the position
    Number(f64),
    /// String bytes to show
    Bytes(Vec<u8>),
}

/// Sequence of `TJ` items.
pub type TextSeq = Vec<TextSeqItem>;

/// One string being shown.
pub struct TextRun<'a> {
    /// Font selected by `Tf` or `gs`, None if no font is set
    pub font: Option<&'a FontResource>,
    pub bytes: &'a [u8],
    /// Text state including size, spacing, scaling and rise
    pub state: &'a PDFTextState,
    /// Text matrix concatenated with the CTM
    pub matrix: Matrix,
    /// Paint color for the render mode, None for invisible modes
    pub color: Option<&'a Color>,
    pub resolver: &'a dyn ObjectResolver,
}

/// Letters produced for a run and the horizontal displacement, in
/// unscaled text space, to apply to the text matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShownText {
    pub letters: Vec<Letter>,
    pub advance: f64,
}

/// Turns shown strings into letters.
pub trait LetterSource {
    fn show_text(&mut self, run: &TextRun<'_>) -> ShownText;
}

impl<L: LetterSource + ?Sized> LetterSource for &mut L {
    fn show_text(&mut self, run: &TextRun<'_>) -> ShownText {
        (**self).show_text(run)
    }
}

/// Discards text. The text matrix does not move.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLetters;

impl LetterSource for NoLetters {
    fn show_text(&mut self, _run: &TextRun<'_>) -> ShownText {
        ShownText::default()
    }
}

/// Glyph metrics read from a simple font dictionary.
#[derive(Debug, Clone, PartialEq)]
struct SimpleMetrics {
    first_char: i64,
    widths: Vec<f64>,
    missing_width: f64,
    descent: f64,
}

impl SimpleMetrics {
    fn from_dict(dict: &PDFDict, resolver: &dyn ObjectResolver) -> Self {
        let get = |d: &PDFDict, key: &str| d.get(key).and_then(|o| resolve_object(resolver, o).ok());
        let descriptor = get(dict, "FontDescriptor");
        let descriptor = descriptor.as_ref().and_then(|d| d.as_dict().ok());
        let from_descriptor = |key: &str| {
            descriptor
                .and_then(|d| get(d, key))
                .and_then(|o| o.as_num().ok())
        };
        let widths = get(dict, "Widths")
            .and_then(|w| match w {
                PDFObject::Array(items) => Some(
                    items
                        .iter()
                        .map(|i| resolve_object(resolver, i).and_then(|o| o.as_num()).unwrap_or(0.0))
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();
        Self {
            first_char: get(dict, "FirstChar").and_then(|o| o.as_int().ok()).unwrap_or(0),
            widths,
            missing_width: from_descriptor("MissingWidth").unwrap_or(DEFAULT_GLYPH_WIDTH),
            descent: from_descriptor("Descent").unwrap_or(0.0),
        }
    }

    fn width(&self, code: u8) -> f64 {
        let idx = i64::from(code) - self.first_char;
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.widths.get(i))
            .copied()
            .unwrap_or(self.missing_width)
    }
}

/// Letter source for single-byte fonts with a `/Widths` array.
///
/// Each byte is one glyph; its text is the Latin-1 character for the code.
#[derive(Debug, Default)]
pub struct WidthsLetterSource {
    cache: Option<(u64, SimpleMetrics)>,
}

impl WidthsLetterSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn metrics(&mut self, font: &FontResource, resolver: &dyn ObjectResolver) -> &SimpleMetrics {
        self.cache.take_if(|(id, _)| *id != font.id);
        let (_, metrics) = self
            .cache
            .get_or_insert_with(|| (font.id, SimpleMetrics::from_dict(&font.dict, resolver)));
        metrics
    }
}

impl LetterSource for WidthsLetterSource {
    fn show_text(&mut self, run: &TextRun<'_>) -> ShownText {
        let ts = run.state;
        let hscale = ts.scaling * 0.01;
        let fontsize = ts.fontsize;
        let metrics = match run.font {
            Some(font) => self.metrics(font, run.resolver).clone(),
            None => SimpleMetrics {
                first_char: 0,
                widths: Vec::new(),
                missing_width: 0.0,
                descent: 0.0,
            },
        };
        let font_name = run.font.and_then(FontResource::base_font).map(str::to_string);
        let descent = metrics.descent * 0.001 * fontsize;
        let font_size = fontsize * matrix_scale(run.matrix);

        let mut letters = Vec::with_capacity(run.bytes.len());
        let mut x = 0.0;
        for &code in run.bytes {
            let w = metrics.width(code) * 0.001 * fontsize * hscale;
            let y0 = ts.rise + descent;
            if run.font.is_some() {
                let (ax, ay) = apply_matrix_norm(run.matrix, (w, 0.0));
                letters.push(Letter {
                    value: if code < 0x20 { String::new() } else { char::from(code).to_string() },
                    bbox: apply_matrix_rect(run.matrix, (x, y0, x + w, y0 + fontsize)),
                    origin: apply_matrix_pt(run.matrix, (x, ts.rise)),
                    advance: ax.hypot(ay),
                    font_name: font_name.clone(),
                    font_size,
                    color: run.color.cloned(),
                    render_mode: ts.render,
                });
            }
            x += w + ts.charspace * hscale;
            if code == b' ' {
                x += ts.wordspace * hscale;
            }
        }
        ShownText { letters, advance: x }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::objects::NoResolver;
    use crate::utils::MATRIX_IDENTITY;

    fn font(widths: &[i64]) -> FontResource {
        let mut dict = PDFDict::new();
        dict.insert("BaseFont".into(), PDFObject::Name("Test".into()));
        dict.insert("FirstChar".into(), PDFObject::Int(65));
        dict.insert(
            "Widths".into(),
            PDFObject::Array(widths.iter().map(|&w| PDFObject::Int(w)).collect()),
        );
        FontResource {
            id: 1,
            objref: None,
            dict,
        }
    }

    #[test]
    fn test_widths_advance() {
        let f = font(&[600, 400]);
        let mut state = PDFTextState::new();
        state.fontsize = 10.0;
        let run = TextRun {
            font: Some(&f),
            bytes: b"AB",
            state: &state,
            matrix: MATRIX_IDENTITY,
            color: None,
            resolver: &NoResolver,
        };
        let shown = WidthsLetterSource::new().show_text(&run);
        assert_eq!(shown.letters.len(), 2);
        assert!((shown.advance - 10.0).abs() < 1e-9);
        assert_eq!(shown.letters[1].origin, (6.0, 0.0));
        assert_eq!(shown.letters[0].value, "A");
        assert_eq!(shown.letters[0].font_name.as_deref(), Some("Test"));
    }

    #[test]
    fn test_word_spacing_on_space_only() {
        let f = font(&[]);
        let mut state = PDFTextState::new();
        state.fontsize = 1.0;
        state.wordspace = 3.0;
        let run = TextRun {
            font: Some(&f),
            bytes: b"A A",
            state: &state,
            matrix: MATRIX_IDENTITY,
            color: None,
            resolver: &NoResolver,
        };
        let shown = WidthsLetterSource::new().show_text(&run);
        // three missing-width glyphs plus one word space
        assert!((shown.advance - (1.5 + 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_no_letters() {
        let state = PDFTextState::new();
        let run = TextRun {
            font: None,
            bytes: b"xyz",
            state: &state,
            matrix: MATRIX_IDENTITY,
            color: None,
            resolver: &NoResolver,
        };
        assert_eq!(NoLetters.show_text(&run), ShownText::default());
    }
}
