//! Finalized output of one interpreter run.

use std::sync::Arc;

use bytes::Bytes;

use super::color::{Color, RgbColor};
use super::colorspace::ColorSpace;
use super::objects::PDFDict;
use super::path::Path;
use super::shading::Shading;
use crate::utils::{Matrix, Point, Rect};

/// A placed glyph as reported by the letter source.
#[derive(Debug, Clone, PartialEq)]
pub struct Letter {
    /// Unicode text for the glyph, possibly empty
    pub value: String,
    /// Glyph box in device space
    pub bbox: Rect,
    /// Baseline origin in device space
    pub origin: Point,
    /// Horizontal advance in device space
    pub advance: f64,
    pub font_name: Option<String>,
    /// Font size times the text-space scale of the CTM and text matrix
    pub font_size: f64,
    /// Fill color for fill render modes, stroke color otherwise
    pub color: Option<Color>,
    pub render_mode: i32,
}

/// An image XObject or inline image placed on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    /// Resource name, None for inline images
    pub name: Option<String>,
    /// Unit square mapped through the CTM
    pub bounds: Rect,
    pub ctm: Matrix,
    pub width: i64,
    pub height: i64,
    pub bits_per_component: Option<i64>,
    pub color_space: Option<Arc<ColorSpace>>,
    pub is_image_mask: bool,
    pub is_inline: bool,
    /// Image attributes with abbreviations expanded
    pub attrs: PDFDict,
    pub data: Bytes,
}

/// Area painted by the `sh` operator.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadingFill {
    pub name: String,
    pub shading: Arc<Shading>,
    /// CTM at the time of painting; shading space maps through it
    pub ctm: Matrix,
    /// Region painted: current clip, or the shading BBox when unclipped
    pub region: Option<Path>,
    /// Start and end colors of an axial or radial shading
    pub end_colors: Option<(RgbColor, RgbColor)>,
}

/// A marked-content sequence or point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkedContent {
    pub tag: String,
    pub mcid: Option<i64>,
    pub properties: Option<PDFDict>,
    /// True for MP/DP points, which carry no content
    pub is_point: bool,
    /// Indices into `PageContent::paths`
    pub paths: Vec<usize>,
    /// Indices into `PageContent::letters`
    pub letters: Vec<usize>,
    /// Indices into `PageContent::images`
    pub images: Vec<usize>,
    pub children: Vec<MarkedContent>,
}

/// A problem skipped in lenient mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub operator: String,
    pub message: String,
}

/// Everything one page's content stream produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub paths: Vec<Path>,
    pub letters: Vec<Letter>,
    pub images: Vec<ImageRecord>,
    pub shading_fills: Vec<ShadingFill>,
    /// Top-level marked-content elements
    pub marked_content: Vec<MarkedContent>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PageContent {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
            && self.letters.is_empty()
            && self.images.is_empty()
            && self.shading_fills.is_empty()
    }

    /// Concatenated letter values in content order.
    pub fn text(&self) -> String {
        self.letters.iter().map(|l| l.value.as_str()).collect()
    }
}
