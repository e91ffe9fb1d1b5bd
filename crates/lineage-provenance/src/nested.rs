//! Provenance of repositories nested in a root checkout.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use lineage_core::{Issue, NestedProvenance, RepositoryProvenance, VcsInfo};
use lineage_vcs::{VcsRegistry, WorkingTree};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cache::ProvenanceCache;

const ISSUE_SOURCE: &str = "nested-provenance";

/// Default bound on how deep repositories may be nested.
pub const DEFAULT_MAX_NESTED_DEPTH: usize = 8;

/// A repository found at some level below the root.
#[derive(Debug)]
struct Level {
    /// Path relative to the root checkout, `""` for the root.
    path: String,
    tree: Arc<dyn WorkingTree>,
    depth: usize,
    /// `(normalized url, revision)` of this repository and all its ancestors.
    ancestry: Vec<(String, String)>,
}

/// Resolves the sub-repositories of a root repository.
///
/// Discovery proceeds level by level: the sub-repositories of a level are
/// resolved concurrently, and a sub-repository is only descended into once
/// its own provenance is known. Failures never abort siblings; they are
/// collected into a single issue on the (then partial) result.
#[derive(Debug, Clone)]
pub struct NestedProvenanceResolver {
    registry: VcsRegistry,
    max_depth: usize,
    semaphore: Arc<Semaphore>,
    cache: Option<ProvenanceCache>,
}

impl NestedProvenanceResolver {
    #[must_use]
    pub fn new(registry: VcsRegistry, max_concurrency: usize) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_NESTED_DEPTH,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            cache: None,
        }
    }

    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: ProvenanceCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn resolve(&self, root: &RepositoryProvenance) -> NestedProvenance {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get_nested(root).await {
                return hit;
            }
        }

        let tree = match self.checkout_root(root).await {
            Ok(tree) => tree,
            Err(reason) => {
                let message = format!(
                    "Could not check out '{}' at {}: {reason}",
                    root.vcs_info.url, root.resolved_revision
                );
                tracing::warn!(url = %root.vcs_info.url, %message, "nested provenance failed");
                return NestedProvenance::new(
                    root.clone(),
                    BTreeMap::new(),
                    Some(Issue::new(ISSUE_SOURCE, message)),
                );
            }
        };

        let mut nested = BTreeMap::new();
        let mut failures: Vec<String> = Vec::new();
        let mut frontier = vec![Level {
            path: String::new(),
            tree,
            depth: 0,
            ancestry: vec![root.checkout_key()],
        }];

        while !frontier.is_empty() {
            let mut set = JoinSet::new();
            for parent in &frontier {
                for sub in parent.tree.nested_repositories() {
                    let path = join_path(&parent.path, sub);
                    let depth = parent.depth + 1;
                    if depth > self.max_depth {
                        failures.push(format!(
                            "{path}: nested deeper than {} levels",
                            self.max_depth
                        ));
                        continue;
                    }
                    let dir = parent.tree.root().join(sub);
                    let ancestry = parent.ancestry.clone();
                    let registry = self.registry.clone();
                    let semaphore = Arc::clone(&self.semaphore);
                    set.spawn(async move {
                        let Ok(_permit) = semaphore.acquire_owned().await else {
                            return (path, Err("resolver is shutting down".to_string()));
                        };
                        let outcome = resolve_sub_repository(&registry, dir, depth, ancestry).await;
                        (path, outcome)
                    });
                }
            }

            let mut next = Vec::new();
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((path, Ok((provenance, level)))) => {
                        nested.insert(path.clone(), provenance);
                        next.push(Level { path, ..level });
                    }
                    Ok((path, Err(reason))) => failures.push(format!("{path}: {reason}")),
                    Err(error) => failures.push(format!("resolution task failed: {error}")),
                }
            }
            next.sort_by(|a, b| a.path.cmp(&b.path));
            frontier = next;
        }

        let issue = (!failures.is_empty()).then(|| {
            failures.sort();
            let message = format!(
                "Could not resolve {} nested repositories of '{}': {}",
                failures.len(),
                root.vcs_info.url,
                failures.join("; ")
            );
            tracing::warn!(url = %root.vcs_info.url, %message, "nested provenance is partial");
            Issue::new(ISSUE_SOURCE, message)
        });

        let result = NestedProvenance::new(root.clone(), nested, issue);
        if let Some(cache) = &self.cache {
            cache.put_nested(&result).await;
        }
        result
    }

    async fn checkout_root(&self, root: &RepositoryProvenance) -> Result<Arc<dyn WorkingTree>, String> {
        let system = self
            .registry
            .require(&root.vcs_info)
            .map_err(|e| e.to_string())?;
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| e.to_string())?;
        system
            .checkout(&root.vcs_info, &root.resolved_revision)
            .await
            .map_err(|e| e.to_string())
    }
}

fn join_path(parent: &str, sub: &str) -> String {
    if parent.is_empty() {
        sub.to_string()
    } else {
        format!("{parent}/{sub}")
    }
}

/// Open the sub-repository at `dir` and derive its provenance. Rejects a
/// repository that is one of its own ancestors.
async fn resolve_sub_repository(
    registry: &VcsRegistry,
    dir: PathBuf,
    depth: usize,
    mut ancestry: Vec<(String, String)>,
) -> Result<(RepositoryProvenance, Level), String> {
    let tree = registry
        .for_directory(&dir)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("'{}' is not a working tree", dir.display()))?;
    let is_own_root =
        tree.root() == dir || dir.canonicalize().is_ok_and(|real| real == tree.root());
    if !is_own_root {
        return Err(format!(
            "'{}' is not the root of a working tree",
            dir.display()
        ));
    }

    let revision = tree.revision().to_string();
    let provenance = RepositoryProvenance::new(
        VcsInfo::new(tree.vcs_type(), tree.remote_url(), revision.clone(), ""),
        revision,
    );
    let key = provenance.checkout_key();
    if ancestry.contains(&key) {
        return Err(format!(
            "repository '{}' at {} is one of its own ancestors",
            key.0, key.1
        ));
    }
    ancestry.push(key);

    Ok((
        provenance,
        Level {
            path: String::new(),
            tree,
            depth,
            ancestry,
        },
    ))
}
