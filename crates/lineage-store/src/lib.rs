//! # lineage-store
//!
//! Key to blob storage used to cache provenance results and artifacts between
//! pipeline stages.
//!
//! - [`LocalFileStorage`]: files below a root directory, atomic replacement
//! - [`CompressedFileStorage`]: the same, gzip-compressed
//! - [`MemoryStorage`]: in-process map for tests and dry runs
//!
//! Keys are opaque, usually path-shaped strings. Every implementation rejects
//! keys that would resolve outside of its root with
//! [`StorageError::PathViolation`].

pub mod compressed;
pub mod error;
mod key;
pub mod local;
pub mod memory;

use std::io::Read;

pub use compressed::CompressedFileStorage;
pub use error::StorageError;
pub use local::LocalFileStorage;
pub use memory::MemoryStorage;

/// A key to blob association safe for concurrent use.
pub trait ArtifactStore: Send + Sync {
    /// Whether a blob is stored under `key`. Has no side effects.
    ///
    /// # Errors
    ///
    /// Only [`StorageError::PathViolation`].
    fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Open the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if absent, [`StorageError::PathViolation`]
    /// for keys outside of the root, [`StorageError::Io`] otherwise.
    fn read(&self, key: &str) -> Result<Box<dyn Read + Send>, StorageError>;

    /// Store the content of `data` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// [`StorageError::PathViolation`] for keys outside of the root,
    /// [`StorageError::Io`] if reading `data` or writing the blob fails.
    fn write(&self, key: &str, data: &mut dyn Read) -> Result<(), StorageError>;

    /// Read the whole blob into memory.
    ///
    /// # Errors
    ///
    /// See [`ArtifactStore::read`].
    fn read_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.read(key)?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// # Errors
    ///
    /// See [`ArtifactStore::write`].
    fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut reader = bytes;
        self.write(key, &mut reader)
    }
}
