//! Where cached results and checkouts are kept.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const fn default_compress() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory of the local store. Empty means the user cache
    /// directory.
    #[serde(default)]
    pub root: String,

    /// Gzip stored blobs.
    #[serde(default = "default_compress")]
    pub compress: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: String::new(),
            compress: default_compress(),
        }
    }
}

impl StorageConfig {
    /// The configured root, or `<cache dir>/lineage` when none is set.
    #[must_use]
    pub fn root_path(&self) -> PathBuf {
        let root = self.root.trim();
        if !root.is_empty() {
            return PathBuf::from(root);
        }
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("lineage")
    }

    /// Directory checkouts are made in, below the root.
    #[must_use]
    pub fn checkout_dir(&self) -> PathBuf {
        self.root_path().join("checkouts")
    }

    /// Directory the provenance cache lives in, below the root.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.root_path().join("cache")
    }

    /// Directory fetched source artifacts are kept in, below the root.
    #[must_use]
    pub fn sources_dir(&self) -> PathBuf {
        self.root_path().join("sources")
    }
}
