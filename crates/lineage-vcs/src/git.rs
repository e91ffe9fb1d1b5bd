//! Git support built on `gix`.
//!
//! Repositories are inspected with `gix`; creating a new checkout shells out
//! to the `git` CLI. Only local repositories (absolute paths and `file://`
//! URLs) are supported: there is no network clone or fetch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lineage_core::{VcsInfo, VcsType};
use tokio::process::Command;

use crate::error::VcsError;
use crate::walk::find_nested_repositories;
use crate::{VersionControlSystem, WorkingTree, file_url, local_path};

/// Snapshot of a git working tree taken when it was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitWorkingTree {
    root: PathBuf,
    remote_url: String,
    revision: String,
    nested: Vec<String>,
}

impl GitWorkingTree {
    /// Open the working tree containing `path`. Returns `None` if `path` is
    /// not inside a non-bare repository.
    ///
    /// Blocking: reads repository metadata and walks the whole tree.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::Git`] if the repository has no commit checked out.
    pub fn open(path: &Path) -> Result<Option<Self>, VcsError> {
        let Ok(repo) = gix::discover(path) else {
            return Ok(None);
        };
        let Some(root) = repo.work_dir().map(Path::to_path_buf) else {
            return Ok(None);
        };
        let root = root.canonicalize().unwrap_or(root);

        let remote_url = repo
            .config_snapshot()
            .string("remote.origin.url")
            .map(|v| v.to_string())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| file_url(&root));
        let revision = repo
            .head_id()
            .map_err(|e| VcsError::Git(format!("resolve HEAD of '{}': {e}", root.display())))?
            .to_string();
        let nested = find_nested_repositories(&root);

        tracing::debug!(
            root = %root.display(),
            %remote_url,
            %revision,
            nested = nested.len(),
            "opened git working tree"
        );

        Ok(Some(Self {
            root,
            remote_url,
            revision,
            nested,
        }))
    }
}

impl WorkingTree for GitWorkingTree {
    fn root(&self) -> &Path {
        &self.root
    }

    fn vcs_type(&self) -> VcsType {
        VcsType::Git
    }

    fn remote_url(&self) -> &str {
        &self.remote_url
    }

    fn revision(&self) -> &str {
        &self.revision
    }

    fn nested_repositories(&self) -> &[String] {
        &self.nested
    }
}

/// Git as a [`VersionControlSystem`].
///
/// New checkouts are created as clones below `workspace`, one directory per
/// repository and revision.
#[derive(Debug, Clone)]
pub struct GitVcs {
    workspace: PathBuf,
}

impl GitVcs {
    #[must_use]
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    #[must_use]
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    fn require_local(url: &str) -> Result<PathBuf, VcsError> {
        local_path(url).ok_or_else(|| {
            VcsError::Unsupported(format!(
                "'{url}' is not a local repository; remote repositories are not fetched"
            ))
        })
    }

    fn checkout_dir(&self, source: &Path, revision: &str) -> PathBuf {
        let name = source
            .file_name()
            .map_or_else(|| "repository".to_string(), |n| n.to_string_lossy().into_owned());
        let short: String = revision.chars().take(12).collect();
        self.workspace.join(format!("{name}-{short}"))
    }

    async fn open_blocking(path: PathBuf) -> Result<Option<GitWorkingTree>, VcsError> {
        tokio::task::spawn_blocking(move || GitWorkingTree::open(&path)).await?
    }
}

/// Resolve `revision` (empty meaning `HEAD`) to a commit id in the repository
/// at `path`.
fn rev_parse(path: &Path, url: &str, revision: &str) -> Result<String, VcsError> {
    let repo = gix::open(path).map_err(|e| VcsError::Git(format!("open '{url}': {e}")))?;
    let revision = revision.trim();
    let spec = if revision.is_empty() {
        "HEAD^{commit}".to_string()
    } else {
        format!("{revision}^{{commit}}")
    };
    let id = repo
        .rev_parse_single(spec.as_str())
        .map_err(|_| VcsError::RevisionNotFound {
            url: url.to_string(),
            revision: revision.to_string(),
        })?;
    Ok(id.to_string())
}

/// Whether `tree` is rooted exactly at `path` and has `revision` checked out.
fn is_root_at(tree: &GitWorkingTree, path: &Path, revision: &str) -> bool {
    path.canonicalize().is_ok_and(|path| path == tree.root) && tree.revision == revision
}

async fn run_git(dir: &Path, args: &[&str]) -> Result<(), VcsError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await?;
    if output.status.success() {
        Ok(())
    } else {
        Err(VcsError::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

#[async_trait]
impl VersionControlSystem for GitVcs {
    fn vcs_type(&self) -> VcsType {
        VcsType::Git
    }

    fn is_applicable_url(&self, url: &str) -> bool {
        local_path(url).is_some_and(|path| {
            path.join(".git").exists() || path.join("HEAD").is_file()
        })
    }

    async fn for_directory(&self, path: &Path) -> Result<Option<Arc<dyn WorkingTree>>, VcsError> {
        let tree = Self::open_blocking(path.to_path_buf()).await?;
        Ok(tree.map(|tree| Arc::new(tree) as Arc<dyn WorkingTree>))
    }

    async fn resolve_revision(&self, vcs: &VcsInfo) -> Result<String, VcsError> {
        let path = Self::require_local(&vcs.url)?;
        let url = vcs.url.clone();
        let revision = vcs.revision.clone();
        let resolved =
            tokio::task::spawn_blocking(move || rev_parse(&path, &url, &revision)).await??;
        tracing::debug!(url = %vcs.url, requested = %vcs.revision, %resolved, "pinned revision");
        Ok(resolved)
    }

    async fn checkout(
        &self,
        vcs: &VcsInfo,
        revision: &str,
    ) -> Result<Arc<dyn WorkingTree>, VcsError> {
        let source = Self::require_local(&vcs.url)?;

        // A working tree that already has the revision checked out is used in place.
        if let Some(tree) = Self::open_blocking(source.clone()).await? {
            if is_root_at(&tree, &source, revision) {
                return Ok(Arc::new(tree));
            }
        }

        let target = self.checkout_dir(&source, revision);
        if let Some(tree) = Self::open_blocking(target.clone()).await? {
            if is_root_at(&tree, &target, revision) {
                return Ok(Arc::new(tree));
            }
        }
        if target.exists() {
            return Err(VcsError::Git(format!(
                "checkout directory '{}' exists but does not hold revision {revision}",
                target.display()
            )));
        }

        tokio::fs::create_dir_all(&self.workspace).await?;
        let source_arg = source.to_string_lossy();
        let target_arg = target.to_string_lossy();
        run_git(
            &self.workspace,
            &["clone", "--quiet", "--no-checkout", &source_arg, &target_arg],
        )
        .await?;
        run_git(&target, &["checkout", "--quiet", "--detach", revision]).await?;
        if let Err(error) = run_git(
            &target,
            &[
                "-c",
                "protocol.file.allow=always",
                "submodule",
                "update",
                "--init",
                "--recursive",
                "--quiet",
            ],
        )
        .await
        {
            tracing::warn!(target = %target.display(), %error, "submodule initialization failed");
        }

        tracing::info!(url = %vcs.url, revision, target = %target.display(), "checked out");
        Self::open_blocking(target.clone())
            .await?
            .map(|tree| Arc::new(tree) as Arc<dyn WorkingTree>)
            .ok_or(VcsError::NotAWorkingTree(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_dirs_are_per_revision() {
        let vcs = GitVcs::new("/work");
        let a = vcs.checkout_dir(Path::new("/srv/repo"), "0123456789abcdef0123");
        let b = vcs.checkout_dir(Path::new("/srv/repo"), "fedcba9876543210fedc");
        assert_eq!(a, PathBuf::from("/work/repo-0123456789ab"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn remote_urls_are_unsupported() {
        let vcs = GitVcs::new("/work");
        let info = VcsInfo::new(VcsType::Git, "https://github.com/oss/tool", "main", "");
        assert!(matches!(
            vcs.resolve_revision(&info).await,
            Err(VcsError::Unsupported(_))
        ));
        assert!(!vcs.is_applicable_url("https://github.com/oss/tool"));
    }
}
