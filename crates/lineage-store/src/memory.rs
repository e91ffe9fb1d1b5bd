//! In-memory storage for tests and dry runs.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, PoisonError, RwLock};

use crate::ArtifactStore;
use crate::error::StorageError;
use crate::key::normalize_key;

/// Keys are normalized the same way [`crate::LocalFileStorage`] does, so
/// `a/./b` and `a/b` address the same entry.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Arc<[u8]>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys in normalized form.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn key(key: &str) -> Result<String, StorageError> {
        Ok(normalize_key(key)?.to_string_lossy().replace('\\', "/"))
    }
}

impl ArtifactStore for MemoryStorage {
    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let key = Self::key(key)?;
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key))
    }

    fn read(&self, key: &str) -> Result<Box<dyn Read + Send>, StorageError> {
        let normalized = Self::key(key)?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&normalized)
            .map(|bytes| Box::new(Cursor::new(Arc::clone(bytes))) as Box<dyn Read + Send>)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn write(&self, key: &str, data: &mut dyn Read) -> Result<(), StorageError> {
        let key = Self::key(key)?;
        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes)?;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, bytes.into());
        Ok(())
    }
}
