//! Error types shared by every DocStore crate.
//!
//! We use `thiserror` for `Display`/`Error` impls, matching the rest of the
//! workspace. `Error` is the single error surface returned by every public
//! operation — callers switch on the variant, never on a type-specific error.

use std::io;
use thiserror::Error;

/// Result type alias used throughout DocStore.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error surface for all DocStore operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database or document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Revision mismatch on `Put`/`Delete` (optimistic concurrency failure).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed identifier or body.
    #[error("validation error: {0}")]
    Validation(String),

    /// Underlying storage failure. Fatal for the operation that raised it.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Unreadable manifest, snapshot, or WAL line.
    #[error("corruption: {0}")]
    Corruption(String),
}

impl Error {
    /// True for errors a caller may retry after re-reading the current head.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Corruption(e.to_string())
    }
}
