//! Content stream interpretation.
//!
//! This module contains:
//! - `interpreter`: the page interpreter state machine and operator dispatch
//! - `ops`: operator implementations by category
//! - `resources`: resource scope stack and the shared resource manager
//! - `colorspace`: named color space, shading and pattern resolution
//! - `device`: the letter source seam for text
//! - `params`: interpreter options

pub mod colorspace;
pub mod device;
pub mod interpreter;
pub mod ops;
pub mod params;
pub mod resources;

// Re-export main types for convenience
pub use device::{
    LetterSource, NoLetters, ShownText, TextRun, TextSeq, TextSeqItem, WidthsLetterSource,
};
pub use interpreter::PDFPageInterpreter;
pub use params::InterpreterOptions;
pub use resources::{
    FontId, FontResource, PDFResourceManager, ResourceEntry, ResourceFrame, ResourceKind,
    ResourceStack,
};
