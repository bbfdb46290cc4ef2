//! Content stream parsing.
//!
//! - `lexer`: tokenizer and operand grouper for content streams

pub mod lexer;

pub use lexer::{ContentLexer, ContentToken, Keyword, PDFContentParser, PSToken};
