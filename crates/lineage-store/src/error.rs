use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`crate::ArtifactStore`] implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key is empty, absolute, or resolves outside of the storage root.
    #[error("key '{key}' resolves outside of the storage root")]
    PathViolation { key: String },

    /// No blob is stored under the key.
    #[error("no entry for key '{0}'")]
    NotFound(String),

    #[error("invalid storage root '{path}': {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn violation(key: &str) -> Self {
        Self::PathViolation {
            key: key.to_string(),
        }
    }
}
