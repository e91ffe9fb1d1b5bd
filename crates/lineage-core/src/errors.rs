//! Cross-cutting error types for Lineage.
//!
//! Domain-specific errors (e.g. `StorageError`, `VcsError`) are defined in
//! their respective crates. Resolution failures are never errors: they are
//! recorded as [`crate::Issue`] values on the result they belong to.

use thiserror::Error;

/// Errors that can be raised while building or (de)serializing the model.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Data failed validation (missing identifier fields, duplicate scopes, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A document could not be serialized or deserialized.
    #[error("{format} serialization error: {message}")]
    Serialization { format: String, message: String },

    /// The file extension does not map to a supported document format.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// I/O error while reading or writing a document.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
