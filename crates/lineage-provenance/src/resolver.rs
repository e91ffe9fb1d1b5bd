//! Resolution of every identifier of an analyzer result on a bounded pool.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lineage_core::{
    AnalyzerResult, Identifier, Issue, NestedProvenance, PackageProvenance, ProvenanceResult,
    RemoteArtifact, RepositoryProvenance, VcsInfo,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::nested::NestedProvenanceResolver;
use crate::package::{ISSUE_SOURCE, PackageProvenanceResolver};

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Input for the provenance of one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionInput {
    pub id: Identifier,
    pub vcs: VcsInfo,
    pub source_artifact: Option<RemoteArtifact>,
}

impl ResolutionInput {
    /// One input per project and package of `result`, projects first.
    #[must_use]
    pub fn from_result(result: &AnalyzerResult) -> Vec<Self> {
        let projects = result.projects.iter().map(|project| Self {
            id: project.id.clone(),
            vcs: project.vcs_processed.clone(),
            source_artifact: None,
        });
        let packages = result.packages.values().map(|package| Self {
            id: package.id.clone(),
            vcs: package.vcs_processed.clone(),
            source_artifact: package.source_artifact.clone(),
        });
        projects.chain(packages).collect()
    }
}

/// Progress notifications emitted while [`ProvenanceResolver::resolve_all`] runs.
#[derive(Debug, Clone, Copy)]
pub enum Progress<'a> {
    Package(&'a PackageProvenance),
    Nested(&'a NestedProvenance),
}

/// Runs package and nested provenance resolution for many identifiers.
///
/// At most `max_concurrency` identifiers are resolved at once. Each unit of
/// work has its own timeout; running out of time produces an issue for that
/// identifier only.
#[derive(Debug, Clone)]
pub struct ProvenanceResolver {
    package: Arc<PackageProvenanceResolver>,
    nested: Arc<NestedProvenanceResolver>,
    max_concurrency: usize,
    timeout: Duration,
}

impl ProvenanceResolver {
    #[must_use]
    pub fn new(package: PackageProvenanceResolver, nested: NestedProvenanceResolver) -> Self {
        Self {
            package: Arc::new(package),
            nested: Arc::new(nested),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the provenance of every project and package in `result`, then
    /// the nested provenance of every distinct repository found.
    pub async fn resolve_all(
        &self,
        result: &AnalyzerResult,
        mut on_progress: impl FnMut(Progress<'_>),
    ) -> ProvenanceResult {
        let start_time = Utc::now();
        let inputs = ResolutionInput::from_result(result);
        tracing::info!(identifiers = inputs.len(), "resolving provenance");

        let mut package_provenances = self.resolve_packages(inputs, &mut on_progress).await;
        package_provenances.sort_by(|a, b| a.id().cmp(b.id()));

        let mut roots: BTreeMap<(String, String), RepositoryProvenance> = BTreeMap::new();
        for provenance in &package_provenances {
            if let Some(repository) = provenance.provenance().and_then(|p| p.as_repository()) {
                let mut root = repository.clone();
                root.vcs_info.path.clear();
                roots.entry(root.checkout_key()).or_insert(root);
            }
        }
        let nested_provenances = self
            .resolve_nested(roots.into_values().collect(), &mut on_progress)
            .await;

        let failed = package_provenances
            .iter()
            .filter(|provenance| !provenance.is_resolved())
            .count();
        tracing::info!(
            resolved = package_provenances.len() - failed,
            failed,
            repositories = nested_provenances.len(),
            "provenance resolution finished"
        );

        ProvenanceResult {
            start_time,
            end_time: Utc::now(),
            package_provenances,
            nested_provenances,
        }
    }

    /// Resolve package provenances on the pool. The order of the returned
    /// values is unspecified.
    pub async fn resolve_packages(
        &self,
        inputs: Vec<ResolutionInput>,
        on_progress: &mut impl FnMut(Progress<'_>),
    ) -> Vec<PackageProvenance> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut set = JoinSet::new();
        let mut pending: HashMap<tokio::task::Id, Identifier> = HashMap::new();

        for input in inputs {
            let resolver = Arc::clone(&self.package);
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.timeout;
            let id = input.id.clone();
            let handle = set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return PackageProvenance::failed(
                        input.id.clone(),
                        Issue::new(ISSUE_SOURCE, "resolver is shutting down"),
                    );
                };
                let work = resolver.resolve(&input.id, &input.vcs, input.source_artifact.as_ref());
                match tokio::time::timeout(timeout, work).await {
                    Ok(provenance) => provenance,
                    Err(_) => {
                        tracing::warn!(id = %input.id, ?timeout, "provenance resolution timed out");
                        PackageProvenance::failed(
                            input.id.clone(),
                            Issue::new(ISSUE_SOURCE, timeout_message(&input.id, timeout)),
                        )
                    }
                }
            });
            pending.insert(handle.id(), id);
        }

        let mut provenances = Vec::with_capacity(pending.len());
        while let Some(joined) = set.join_next_with_id().await {
            let provenance = match joined {
                Ok((task, provenance)) => {
                    pending.remove(&task);
                    provenance
                }
                Err(error) => {
                    let Some(id) = pending.remove(&error.id()) else {
                        continue;
                    };
                    tracing::error!(%id, %error, "provenance task failed");
                    PackageProvenance::failed(
                        id.clone(),
                        Issue::new(ISSUE_SOURCE, format!("Resolution of '{id}' failed: {error}")),
                    )
                }
            };
            on_progress(Progress::Package(&provenance));
            provenances.push(provenance);
        }
        provenances
    }

    /// Resolve the nested provenance of each root on the pool, sorted by root.
    pub async fn resolve_nested(
        &self,
        roots: Vec<RepositoryProvenance>,
        on_progress: &mut impl FnMut(Progress<'_>),
    ) -> Vec<NestedProvenance> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut set = JoinSet::new();
        let mut pending: HashMap<tokio::task::Id, RepositoryProvenance> = HashMap::new();

        for root in roots {
            let resolver = Arc::clone(&self.nested);
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.timeout;
            let task_root = root.clone();
            let handle = set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                match tokio::time::timeout(timeout, resolver.resolve(&task_root)).await {
                    Ok(nested) => nested,
                    Err(_) => {
                        let message = format!(
                            "Resolving the nested repositories of '{}' timed out after {}s",
                            task_root.vcs_info.url,
                            timeout.as_secs()
                        );
                        tracing::warn!(url = %task_root.vcs_info.url, "nested provenance timed out");
                        NestedProvenance::new(
                            task_root,
                            BTreeMap::new(),
                            Some(Issue::new(ISSUE_SOURCE, message)),
                        )
                    }
                }
            });
            pending.insert(handle.id(), root);
        }

        let mut results = Vec::with_capacity(pending.len());
        while let Some(joined) = set.join_next_with_id().await {
            let nested = match joined {
                Ok((task, nested)) => {
                    pending.remove(&task);
                    nested
                }
                Err(error) => {
                    let Some(root) = pending.remove(&error.id()) else {
                        continue;
                    };
                    let message = format!(
                        "Resolving the nested repositories of '{}' failed: {error}",
                        root.vcs_info.url
                    );
                    NestedProvenance::new(root, BTreeMap::new(), Some(Issue::new(ISSUE_SOURCE, message)))
                }
            };
            on_progress(Progress::Nested(&nested));
            results.push(nested);
        }
        results.sort_by(|a, b| a.provenance.cmp(&b.provenance));
        results
    }
}

fn timeout_message(id: &Identifier, timeout: Duration) -> String {
    format!(
        "Resolving the provenance of '{id}' timed out after {}s",
        timeout.as_secs_f64()
    )
}
