//! Gzip-compressed variant of [`LocalFileStorage`].

use std::io::Read;
use std::path::Path;

use flate2::Compression;
use flate2::read::{GzDecoder, GzEncoder};

use crate::ArtifactStore;
use crate::error::StorageError;
use crate::local::LocalFileStorage;

/// Stores every blob gzip-compressed as `<key>.gz`.
#[derive(Debug, Clone)]
pub struct CompressedFileStorage {
    inner: LocalFileStorage,
}

impl CompressedFileStorage {
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidRoot`] if `root` is unusable.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let inner = LocalFileStorage::new(root)?.with_path_mapping(|key| format!("{key}.gz"));
        Ok(Self { inner })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.inner.root()
    }
}

impl ArtifactStore for CompressedFileStorage {
    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.exists(key)
    }

    fn read(&self, key: &str) -> Result<Box<dyn Read + Send>, StorageError> {
        let compressed = self.inner.read(key)?;
        Ok(Box::new(GzDecoder::new(compressed)))
    }

    fn write(&self, key: &str, data: &mut dyn Read) -> Result<(), StorageError> {
        let mut encoder = GzEncoder::new(data, Compression::default());
        self.inner.write(key, &mut encoder)
    }
}
