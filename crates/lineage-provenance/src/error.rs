//! Errors of the provenance result cache.
//!
//! Resolution itself never fails: every failure becomes an
//! [`lineage_core::Issue`] on the result. Cache errors are logged and
//! otherwise ignored.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("storage error: {0}")]
    Storage(#[from] lineage_store::StorageError),
    #[error("cached entry is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("cache task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
