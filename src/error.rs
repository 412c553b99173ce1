//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::tokenizer::TokenId;

/// Convenient result type used throughout the crate.
pub type Result<T, E = UbpeError> = std::result::Result<T, E>;

/// Domain-specific error describing failures during construction, fitting,
/// encoding, decoding, or IO.
#[derive(Debug, Error)]
pub enum UbpeError {
    /// A caller-supplied argument violated a documented precondition.
    #[error("precondition violated: {0}")]
    Precondition(String),
    /// `encode` or `decode` was invoked before the tokenizer was fitted.
    #[error("tokenizer has not been fitted")]
    NotFitted,
    /// `decode` encountered an id that is neither in the alphabet nor in the
    /// merge table.
    #[error("unknown token id {0}")]
    UnknownToken(TokenId),
    /// `encode` (or the splitter) encountered a symbol absent from the
    /// alphabet; the payload is the symbol's position in the document.
    #[error("symbol at position {0} is not in the alphabet")]
    UnknownSymbol(usize),
    /// A known-word id supplied to the splitter collides with the reserved
    /// alphabet id range.
    #[error("known-word id {id} collides with the alphabet range 0..{alphabet_size}")]
    InsertionConflict {
        /// The offending known-word id.
        id: TokenId,
        /// Size of the alphabet whose id range is reserved.
        alphabet_size: u32,
    },
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for UbpeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl UbpeError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }

    /// Helper constructor for [`UbpeError::Precondition`].
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }
}
