//! Error types for the trazo page-content core.

use thiserror::Error;

/// Primary error type for content interpretation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PdfError {
    #[error("invalid token at position {pos}: {msg}")]
    TokenError { pos: usize, msg: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("key not found: {0}")]
    KeyError(String),

    #[error("PDF object not found: {0}")]
    ObjectNotFound(u32),

    #[error("PDF syntax error: {0}")]
    SyntaxError(String),

    /// Missing or malformed required dictionary data, or a cyclic color space.
    #[error("document format error: {0}")]
    DocumentFormat(String),

    /// A path was mutated after it had been finalized.
    #[error("invalid path state: {0}")]
    InvalidPathState(&'static str),

    /// A function call could not produce its outputs.
    #[error("function evaluation failed: {0}")]
    FunctionEvaluation(String),

    /// Recognized but unimplemented construct.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl PdfError {
    /// Benign errors that lenient processing treats as a no-op.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidPathState(_))
    }

    /// Errors a caller may paint a placeholder for instead of failing.
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedFeature(_))
    }

    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::DocumentFormat(msg.into())
    }
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
