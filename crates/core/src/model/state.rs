//! PDF Graphics and Text State.
//!
//! Both states are saved and restored as a unit by `q`/`Q` together with
//! the current transformation matrix.

use std::sync::Arc;

use super::color::Color;
use super::colorspace::{ColorSpace, Components};
use super::path::{DashPattern, LineCap, LineJoin, Path};
use crate::interp::resources::FontResource;
use crate::utils::{MATRIX_IDENTITY, Matrix};

/// Color space plus current color for one paint operation kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorState {
    pub space: Arc<ColorSpace>,
    /// Components as supplied by `sc`/`scn`
    pub components: Components,
    /// Converted value recorded on painted paths
    pub color: Color,
}

impl ColorState {
    /// State after selecting `space`: the space's initial color.
    pub fn new(space: Arc<ColorSpace>) -> Self {
        let components = space.initial_components();
        let color = space.initial_color();
        Self {
            space,
            components,
            color,
        }
    }
}

impl Default for ColorState {
    fn default() -> Self {
        Self::new(Arc::new(ColorSpace::DeviceGray))
    }
}

/// PDF Text State - text positioning and rendering parameters.
#[derive(Debug, Clone)]
pub struct PDFTextState {
    /// Current font (None if not set)
    pub font: Option<Arc<FontResource>>,
    /// Current font resource name (e.g., "F1")
    pub fontname: Option<String>,
    /// Font size in text space units
    pub fontsize: f64,
    /// Character spacing (Tc)
    pub charspace: f64,
    /// Word spacing (Tw), applied to single-byte code 32
    pub wordspace: f64,
    /// Horizontal scaling percentage (100 = normal)
    pub scaling: f64,
    /// Text leading (TL)
    pub leading: f64,
    /// Text rendering mode (0-7)
    pub render: i32,
    /// Text rise (Ts)
    pub rise: f64,
    /// Text matrix (Tm)
    pub matrix: Matrix,
    /// Text line matrix, start of the current line
    pub linematrix: Matrix,
}

impl PDFTextState {
    pub fn new() -> Self {
        Self {
            font: None,
            fontname: None,
            fontsize: 0.0,
            charspace: 0.0,
            wordspace: 0.0,
            scaling: 100.0,
            leading: 0.0,
            render: 0,
            rise: 0.0,
            matrix: MATRIX_IDENTITY,
            linematrix: MATRIX_IDENTITY,
        }
    }

    /// Reset text matrix and line matrix at the start of a text object.
    pub fn reset(&mut self) {
        self.matrix = MATRIX_IDENTITY;
        self.linematrix = MATRIX_IDENTITY;
    }
}

impl Default for PDFTextState {
    fn default() -> Self {
        Self::new()
    }
}

/// PDF Graphics State - parameters in effect for painting operators.
#[derive(Debug, Clone)]
pub struct PDFGraphicState {
    /// Line width in user space units
    pub linewidth: f64,
    pub linecap: LineCap,
    pub linejoin: LineJoin,
    pub miterlimit: f64,
    pub dash: Option<DashPattern>,
    /// Rendering intent name
    pub intent: Option<String>,
    /// Flatness tolerance
    pub flatness: f64,

    /// Stroking color space and color
    pub stroke: ColorState,
    /// Non-stroking color space and color
    pub fill: ColorState,

    /// Stroking alpha (CA)
    pub stroke_alpha: f64,
    /// Non-stroking alpha (ca)
    pub fill_alpha: f64,
    /// Whether an SMask other than /None is active
    pub soft_mask: bool,

    /// Current clipping path in device space, None when unclipped
    pub clip: Option<Path>,
}

impl PDFGraphicState {
    pub fn new() -> Self {
        Self {
            linewidth: 1.0,
            linecap: LineCap::Butt,
            linejoin: LineJoin::Miter,
            miterlimit: 10.0,
            dash: None,
            intent: None,
            flatness: 1.0,
            stroke: ColorState::default(),
            fill: ColorState::default(),
            stroke_alpha: 1.0,
            fill_alpha: 1.0,
            soft_mask: false,
            clip: None,
        }
    }
}

impl Default for PDFGraphicState {
    fn default() -> Self {
        Self::new()
    }
}
