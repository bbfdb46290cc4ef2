//! PDF model types - objects, paths, colors and interpreter output.
//!
//! - `objects` - PDF object types and the `ObjectResolver` boundary
//! - `path` - Subpaths and paths with paint attributes
//! - `color`, `colorspace` - Color values and resolved color spaces
//! - `shading` - Resolved shading dictionaries
//! - `state` - Graphics and text state
//! - `content` - Finalized page output
//! - `page` - Page geometry and content streams

pub mod color;
pub mod colorspace;
pub mod content;
pub mod objects;
pub mod page;
pub mod path;
pub mod shading;
pub mod state;

pub use color::{Color, RgbColor};
pub use colorspace::ColorSpace;
pub use content::{Diagnostic, ImageRecord, Letter, MarkedContent, PageContent, ShadingFill};
pub use objects::{MemoryResolver, ObjectResolver, PDFObjRef, PDFObject, PDFStream};
pub use page::PageInput;
pub use path::{FillingRule, Path, PathCommand, Subpath};
pub use shading::Shading;
pub use state::{PDFGraphicState, PDFTextState};
