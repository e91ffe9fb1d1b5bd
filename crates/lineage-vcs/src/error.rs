use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("git error: {0}")]
    Git(String),
    #[error("not a working tree: {0}")]
    NotAWorkingTree(PathBuf),
    #[error("revision '{revision}' not found in '{url}'")]
    RevisionNotFound { url: String, revision: String },
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    #[error("no version control system is applicable to '{0}'")]
    NoApplicableVcs(String),
    #[error("path '{path}' is outside of working tree '{root}'")]
    OutsideWorkingTree { path: PathBuf, root: PathBuf },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("download of '{url}' failed with status {status}")]
    Download { url: String, status: u16 },
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
