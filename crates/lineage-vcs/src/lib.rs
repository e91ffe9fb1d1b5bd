//! # lineage-vcs
//!
//! Capabilities the provenance resolver consumes to talk to version control
//! systems and artifact hosts:
//! - [`VersionControlSystem`]: pin revisions, open and check out working trees
//! - [`WorkingTree`]: a checked out repository and the repositories nested in it
//! - [`Downloader`]: probe and fetch source artifacts
//!
//! Shipped implementations are [`GitVcs`] (built on `gix`, local repositories
//! only) and [`HttpDownloader`] (built on `reqwest`). Tests substitute their
//! own implementations of the traits.

mod error;
pub mod git;
pub mod http;
pub mod registry;
pub mod walk;

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lineage_core::{RemoteArtifact, VcsInfo, VcsType};
use url::Url;

pub use error::VcsError;
pub use git::{GitVcs, GitWorkingTree};
pub use http::HttpDownloader;
pub use registry::VcsRegistry;

/// A version control system able to pin revisions and produce working trees.
///
/// Implementations run blocking work off the async executor.
#[async_trait]
pub trait VersionControlSystem: Send + Sync + Debug {
    fn vcs_type(&self) -> VcsType;

    /// Whether `url` can be handled by this system.
    fn is_applicable_url(&self, url: &str) -> bool;

    /// The working tree containing `path`, if `path` is inside one.
    async fn for_directory(&self, path: &Path) -> Result<Option<Arc<dyn WorkingTree>>, VcsError>;

    /// Pin the (possibly symbolic) revision of `vcs` to a concrete one.
    async fn resolve_revision(&self, vcs: &VcsInfo) -> Result<String, VcsError>;

    /// Produce a working tree of `vcs` at the pinned `revision`.
    async fn checkout(
        &self,
        vcs: &VcsInfo,
        revision: &str,
    ) -> Result<Arc<dyn WorkingTree>, VcsError>;
}

/// Snapshot of a checked out repository.
pub trait WorkingTree: Send + Sync + Debug {
    fn root(&self) -> &Path;

    fn vcs_type(&self) -> VcsType;

    fn remote_url(&self) -> &str;

    /// The revision currently checked out.
    fn revision(&self) -> &str;

    /// Paths of the repositories directly nested in this one, relative to
    /// [`root`](Self::root), `/`-separated and sorted.
    fn nested_repositories(&self) -> &[String];

    /// Path of `path` relative to the root, `/`-separated.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::OutsideWorkingTree`] if `path` is not below the root.
    fn path_to_root(&self, path: &Path) -> Result<String, VcsError> {
        let relative = path
            .strip_prefix(self.root())
            .map_err(|_| VcsError::OutsideWorkingTree {
                path: path.to_path_buf(),
                root: self.root().to_path_buf(),
            })?;
        Ok(relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"))
    }

    /// Reference to the checked out state of this tree.
    fn vcs_info(&self) -> VcsInfo {
        VcsInfo::new(self.vcs_type(), self.remote_url(), self.revision(), "")
    }
}

/// Fetches source artifacts.
#[async_trait]
pub trait Downloader: Send + Sync + Debug {
    /// Whether the artifact can currently be fetched.
    async fn is_available(&self, artifact: &RemoteArtifact) -> bool;

    /// Download `artifact` into `target_dir`, returning the file written.
    async fn fetch(&self, artifact: &RemoteArtifact, target_dir: &Path)
    -> Result<PathBuf, VcsError>;
}

/// Local filesystem path addressed by a `file://` URL or an absolute path.
#[must_use]
pub fn local_path(url: &str) -> Option<PathBuf> {
    let url = url.trim();
    if url.get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("file:")) {
        return Url::parse(url).ok()?.to_file_path().ok();
    }
    let path = Path::new(url);
    path.is_absolute().then(|| path.to_path_buf())
}

/// `file://` URL of a local path, percent-encoded so [`local_path`] gives
/// the same path back.
#[must_use]
pub fn file_url(path: &Path) -> String {
    Url::from_file_path(path).map_or_else(|()| format!("file://{}", path.display()), String::from)
}
