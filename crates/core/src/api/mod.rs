//! High-level API for interpreting page content.
//!
//! # Example
//!
//! ```ignore
//! use trazo_core::api::interpret_page;
//! use trazo_core::interp::InterpreterOptions;
//! use trazo_core::model::{PageInput, objects::NoResolver};
//!
//! let page = PageInput::new((0.0, 0.0, 612.0, 792.0), &b"0 0 m 100 100 l S"[..]);
//! let content = interpret_page(&page, &NoResolver, &InterpreterOptions::default())?;
//! assert_eq!(content.paths.len(), 1);
//! ```

pub mod high_level;

// Re-export for convenience
pub use high_level::{interpret_page, interpret_page_with, interpret_pages, interpret_pages_with};
