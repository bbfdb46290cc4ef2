//! trazo - page-content interpretation for PDF documents.
//!
//! Turns decoded content streams into a vector model of paths, letters,
//! images, shading fills and marked content, resolving the color spaces
//! and functions needed to paint it. Object scanning and font programs
//! stay outside; the crate talks to them through
//! [`model::objects::ObjectResolver`] and [`interp::LetterSource`].

pub mod api;
pub mod clip;
pub mod error;
pub mod function;
pub mod interp;
pub mod model;
pub mod parser;
pub mod utils;

pub use api::{interpret_page, interpret_page_with, interpret_pages, interpret_pages_with};
pub use interp::{InterpreterOptions, LetterSource, PDFPageInterpreter, PDFResourceManager};
pub use model::{PageContent, PageInput};

pub use error::{PdfError, Result};
