//! Provenance results persisted in an [`ArtifactStore`].

use std::sync::Arc;

use lineage_core::{Identifier, KnownProvenance, NestedProvenance, RepositoryProvenance};
use lineage_store::{ArtifactStore, StorageError};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CacheError;

/// Caches resolution results keyed by their (pinned) input.
///
/// Callers decide what is safe to cache; lookups and stores never fail
/// resolution, errors are logged and treated as a miss.
#[derive(Clone)]
pub struct ProvenanceCache {
    store: Arc<dyn ArtifactStore>,
}

impl std::fmt::Debug for ProvenanceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvenanceCache").finish_non_exhaustive()
    }
}

/// Cache key of a package resolved from the origin identified by `origin_key`.
#[must_use]
pub fn package_key(id: &Identifier, origin_key: &str) -> String {
    format!("provenance/package/{}/{origin_key}", id.to_path())
}

/// Cache key of the nested provenance of `root`. The path inside the
/// repository does not take part in the key.
#[must_use]
pub fn nested_key(root: &RepositoryProvenance) -> String {
    let mut whole = root.clone();
    whole.vcs_info.path.clear();
    format!("provenance/nested/{}", whole.storage_key())
}

impl ProvenanceCache {
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    pub async fn get_package(&self, key: &str) -> Option<KnownProvenance> {
        self.get(key).await
    }

    pub async fn put_package(&self, key: &str, provenance: &KnownProvenance) {
        self.put(key, provenance).await;
    }

    /// The cached nested provenance of `root`, reported against `root` itself.
    pub async fn get_nested(&self, root: &RepositoryProvenance) -> Option<NestedProvenance> {
        let mut cached: NestedProvenance = self.get(&nested_key(root)).await?;
        cached.provenance = root.clone();
        Some(cached)
    }

    /// Store `nested` if it is complete; partial results are never cached.
    pub async fn put_nested(&self, nested: &NestedProvenance) {
        if nested.is_complete() {
            self.put(&nested_key(&nested.provenance), nested).await;
        }
    }

    async fn get<T: DeserializeOwned + Send + 'static>(&self, key: &str) -> Option<T> {
        let store = Arc::clone(&self.store);
        let owned_key = key.to_string();
        let lookup = tokio::task::spawn_blocking(move || -> Result<Option<T>, CacheError> {
            let bytes = match store.read_bytes(&owned_key) {
                Ok(bytes) => bytes,
                Err(StorageError::NotFound(_)) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            Ok(Some(serde_json::from_slice(&bytes)?))
        })
        .await
        .map_err(CacheError::from)
        .and_then(|inner| inner);

        match lookup {
            Ok(Some(value)) => {
                tracing::debug!(key, "provenance cache hit");
                Some(value)
            }
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(key, %error, "provenance cache lookup failed");
                None
            }
        }
    }

    async fn put<T: Serialize>(&self, key: &str, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(key, %error, "could not serialize provenance for the cache");
                return;
            }
        };
        let store = Arc::clone(&self.store);
        let owned_key = key.to_string();
        let stored = tokio::task::spawn_blocking(move || store.write_bytes(&owned_key, &bytes))
            .await
            .map_err(CacheError::from)
            .and_then(|inner| inner.map_err(CacheError::from));
        if let Err(error) = stored {
            tracing::warn!(key, %error, "could not store provenance in the cache");
        }
    }
}
