//! Provenance of single packages and projects.

use std::sync::Arc;

use lineage_core::{
    ArtifactProvenance, Identifier, Issue, KnownProvenance, Package, PackageProvenance, Project,
    RemoteArtifact, RepositoryProvenance, SourceCodeOrigin, VcsInfo,
};
use lineage_store::{ArtifactStore, StorageError};
use lineage_vcs::{Downloader, VcsRegistry};

use crate::cache::{ProvenanceCache, package_key};

pub(crate) const ISSUE_SOURCE: &str = "provenance";

/// Whether `revision` is a full commit id (SHA-1 or SHA-256 hex), i.e. cannot
/// move anymore.
#[must_use]
pub fn is_pinned_revision(revision: &str) -> bool {
    matches!(revision.len(), 40 | 64) && revision.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Revisions to try when pinning `vcs` for a package of version `version`.
///
/// An explicit revision is the only candidate. Without one, the usual tag
/// spellings of the version are tried.
#[must_use]
pub fn revision_candidates(vcs: &VcsInfo, version: &str) -> Vec<String> {
    let revision = vcs.revision.trim();
    if !revision.is_empty() {
        return vec![revision.to_string()];
    }
    let version = version.trim();
    if version.is_empty() {
        return Vec::new();
    }
    let mut candidates = vec![version.to_string()];
    if !version.starts_with('v') {
        candidates.insert(0, format!("v{version}"));
    }
    candidates
}

/// Determines where the source code of a package verifiably comes from.
///
/// Origins are tried in the configured order (repository first, then source
/// artifact, by default). Failing every origin yields a provenance carrying an
/// issue, never an error.
///
/// With a source store, an artifact origin only succeeds once the artifact
/// has been fetched and stored under [`ArtifactProvenance::storage_key`].
#[derive(Clone)]
pub struct PackageProvenanceResolver {
    registry: VcsRegistry,
    downloader: Arc<dyn Downloader>,
    origins: Vec<SourceCodeOrigin>,
    cache: Option<ProvenanceCache>,
    source_store: Option<Arc<dyn ArtifactStore>>,
}

impl std::fmt::Debug for PackageProvenanceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageProvenanceResolver")
            .field("registry", &self.registry)
            .field("origins", &self.origins)
            .field("cached", &self.cache.is_some())
            .field("source_store", &self.source_store.is_some())
            .finish_non_exhaustive()
    }
}

impl PackageProvenanceResolver {
    #[must_use]
    pub fn new(registry: VcsRegistry, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            registry,
            downloader,
            origins: SourceCodeOrigin::DEFAULT_ORDER.to_vec(),
            cache: None,
            source_store: None,
        }
    }

    #[must_use]
    pub fn with_origins(mut self, origins: Vec<SourceCodeOrigin>) -> Self {
        self.origins = origins;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: ProvenanceCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fetch source artifacts into `store`.
    #[must_use]
    pub fn with_source_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.source_store = Some(store);
        self
    }

    pub async fn resolve_package(&self, package: &Package) -> PackageProvenance {
        self.resolve(
            &package.id,
            &package.vcs_processed,
            package.source_artifact.as_ref(),
        )
        .await
    }

    /// Projects only have a repository origin.
    pub async fn resolve_project(&self, project: &Project) -> PackageProvenance {
        self.resolve(&project.id, &project.vcs_processed, None).await
    }

    /// Resolve the provenance of `id` from its repository and / or source
    /// artifact.
    pub async fn resolve(
        &self,
        id: &Identifier,
        vcs: &VcsInfo,
        source_artifact: Option<&RemoteArtifact>,
    ) -> PackageProvenance {
        let mut failures = Vec::new();

        for origin in &self.origins {
            let outcome = match origin {
                SourceCodeOrigin::Vcs => self.resolve_vcs(id, vcs).await.map(KnownProvenance::from),
                SourceCodeOrigin::Artifact => self
                    .resolve_artifact(id, source_artifact)
                    .await
                    .map(KnownProvenance::from),
            };
            match outcome {
                Ok(provenance) => {
                    tracing::debug!(%id, origin = origin.as_str(), "resolved provenance");
                    return PackageProvenance::resolved(id.clone(), provenance);
                }
                Err(reason) => failures.push(format!("{}: {reason}", origin.as_str())),
            }
        }

        if failures.is_empty() {
            failures.push("no source code origin is enabled".to_string());
        }
        let message = format!(
            "Could not resolve the provenance of '{id}': {}",
            failures.join("; ")
        );
        tracing::warn!(%id, %message, "provenance resolution failed");
        PackageProvenance::failed(id.clone(), Issue::new(ISSUE_SOURCE, message))
    }

    async fn resolve_vcs(
        &self,
        id: &Identifier,
        vcs: &VcsInfo,
    ) -> Result<RepositoryProvenance, String> {
        if vcs.url.trim().is_empty() {
            return Err("no repository URL is known".to_string());
        }

        let pinned = is_pinned_revision(&vcs.revision);
        let cache_key = pinned.then(|| {
            package_key(
                id,
                &RepositoryProvenance::new(vcs.clone(), vcs.revision.clone()).storage_key(),
            )
        });
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(KnownProvenance::Repository(hit)) = cache.get_package(key).await {
                return Ok(hit);
            }
        }

        let system = self.registry.require(vcs).map_err(|e| e.to_string())?;
        let candidates = revision_candidates(vcs, &id.version);
        if candidates.is_empty() {
            return Err(format!(
                "'{}' names no revision and the package has no version",
                vcs.url
            ));
        }

        let mut errors = Vec::new();
        for candidate in candidates {
            let requested = VcsInfo {
                revision: candidate.clone(),
                ..vcs.clone()
            };
            match system.resolve_revision(&requested).await {
                Ok(resolved) => {
                    let provenance = RepositoryProvenance::new(requested, resolved);
                    if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
                        cache.put_package(key, &provenance.clone().into()).await;
                    }
                    return Ok(provenance);
                }
                Err(error) => errors.push(format!("'{candidate}': {error}")),
            }
        }
        Err(errors.join(", "))
    }

    async fn resolve_artifact(
        &self,
        id: &Identifier,
        source_artifact: Option<&RemoteArtifact>,
    ) -> Result<ArtifactProvenance, String> {
        let artifact = source_artifact
            .filter(|artifact| !artifact.is_empty())
            .ok_or_else(|| "no source artifact is known".to_string())?;
        let provenance = ArtifactProvenance::new(artifact.clone());
        let cache_key = package_key(id, &provenance.storage_key());

        let cached = match &self.cache {
            Some(cache) => matches!(
                cache.get_package(&cache_key).await,
                Some(KnownProvenance::Artifact(_))
            ),
            None => false,
        };

        if !cached && !self.downloader.is_available(artifact).await {
            return Err(format!("source artifact '{}' is not available", artifact.url));
        }
        if let Some(store) = &self.source_store {
            self.store_source(store, &provenance).await?;
        }
        if !cached {
            if let Some(cache) = &self.cache {
                cache.put_package(&cache_key, &provenance.clone().into()).await;
            }
        }
        Ok(provenance)
    }

    /// Fetch the artifact of `provenance` into `store` unless it is there.
    async fn store_source(
        &self,
        store: &Arc<dyn ArtifactStore>,
        provenance: &ArtifactProvenance,
    ) -> Result<(), String> {
        let key = provenance.storage_key();
        let lookup = Arc::clone(store);
        let lookup_key = key.clone();
        let present = tokio::task::spawn_blocking(move || lookup.exists(&lookup_key))
            .await
            .map_err(|e| e.to_string())?
            .map_err(|e| format!("source store lookup failed: {e}"))?;
        if present {
            return Ok(());
        }

        let artifact = &provenance.source_artifact;
        let staging = tempfile::tempdir().map_err(|e| format!("no staging directory: {e}"))?;
        let fetched = self
            .downloader
            .fetch(artifact, staging.path())
            .await
            .map_err(|e| format!("fetching '{}' failed: {e}", artifact.url))?;

        let target = Arc::clone(store);
        let stored_key = key.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let mut file = std::fs::File::open(&fetched)?;
            target.write(&stored_key, &mut file)?;
            drop(staging);
            Ok(())
        })
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| format!("storing '{}' failed: {e}", artifact.url))?;

        tracing::debug!(url = %artifact.url, key = %key, "stored source artifact");
        Ok(())
    }
}
