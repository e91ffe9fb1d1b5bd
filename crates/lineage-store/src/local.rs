//! Filesystem-backed storage rooted at a single directory.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::ArtifactStore;
use crate::error::StorageError;
use crate::key::normalize_key;

type PathMapping = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Stores each key as a file below `root`.
///
/// Writes go to a temporary file in the target directory which is then
/// renamed over the destination, so concurrent readers always observe either
/// the previous or the new content. Keys are checked lexically before any I/O
/// and the deepest existing ancestor is canonicalized to catch symlinks that
/// point out of the root.
#[derive(Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
    mapping: Option<PathMapping>,
}

impl fmt::Debug for LocalFileStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFileStorage")
            .field("root", &self.root)
            .field("mapped", &self.mapping.is_some())
            .finish()
    }
}

impl LocalFileStorage {
    /// Open (and create if missing) a storage rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidRoot`] if `root` cannot be created or is
    /// not a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| StorageError::InvalidRoot {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        let root = root.canonicalize().map_err(|e| StorageError::InvalidRoot {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !root.is_dir() {
            return Err(StorageError::InvalidRoot {
                path: root,
                reason: "not a directory".to_string(),
            });
        }
        Ok(Self {
            root,
            mapping: None,
        })
    }

    /// Translate logical keys to physical relative paths. The logical key is
    /// validated and normalized before it is mapped, and the mapped path is
    /// subject to the same safety checks.
    #[must_use]
    pub fn with_path_mapping<F>(mut self, mapping: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.mapping = Some(Arc::new(mapping));
        self
    }

    /// Canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Physical location of `key`, guaranteed to be below the root.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathViolation`] if the key escapes the root.
    pub fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let logical = normalize_key(key)?;
        let relative = match &self.mapping {
            Some(mapping) => {
                let mapped = mapping(&*logical.to_string_lossy());
                normalize_key(&mapped).map_err(|_| StorageError::violation(key))?
            }
            None => logical,
        };
        let candidate = self.root.join(relative);

        for ancestor in candidate.ancestors() {
            if ancestor == self.root {
                break;
            }
            if ancestor.symlink_metadata().is_err() {
                continue;
            }
            match ancestor.canonicalize() {
                Ok(real) if real.starts_with(&self.root) => break,
                Ok(_) => return Err(StorageError::violation(key)),
                // Dangling symlink: the rename in `write` replaces the link
                // itself, so keep checking the parents.
                Err(_) => {}
            }
        }
        Ok(candidate)
    }
}

impl ArtifactStore for LocalFileStorage {
    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.resolve(key)?.is_file())
    }

    fn read(&self, key: &str) -> Result<Box<dyn Read + Send>, StorageError> {
        let path = self.resolve(key)?;
        if path.is_dir() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        match File::open(&path) {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            // A blob where a directory is expected means the key is absent.
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, data: &mut dyn Read) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        let parent = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(parent)?;

        let mut temp = NamedTempFile::new_in(parent)?;
        let written = io::copy(data, &mut temp)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| StorageError::Io(e.error))?;

        tracing::debug!(key, bytes = written, path = %path.display(), "stored blob");
        Ok(())
    }
}
