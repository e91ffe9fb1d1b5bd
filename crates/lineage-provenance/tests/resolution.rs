//! Provenance resolution against scripted VCS and downloader capabilities.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lineage_core::{
    AnalyzerResult, Hash, Identifier, KnownProvenance, Package, Project, RemoteArtifact,
    RepositoryProvenance, Scope, SourceCodeOrigin, VcsInfo, VcsType,
};
use lineage_provenance::{
    NestedProvenanceResolver, PackageProvenanceResolver, Progress, ProvenanceCache,
    ProvenanceResolver,
};
use lineage_store::{ArtifactStore, MemoryStorage};
use lineage_vcs::{Downloader, VcsError, VcsRegistry, VersionControlSystem, WorkingTree};
use pretty_assertions::assert_eq;

const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const SHA_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const SHA_C: &str = "cccccccccccccccccccccccccccccccccccccccc";

// ── Scripted capabilities ──────────────────────────────────────────

#[derive(Debug, Clone)]
struct ScriptedTree {
    root: PathBuf,
    url: String,
    revision: String,
    nested: Vec<String>,
}

impl WorkingTree for ScriptedTree {
    fn root(&self) -> &Path {
        &self.root
    }

    fn vcs_type(&self) -> VcsType {
        VcsType::Git
    }

    fn remote_url(&self) -> &str {
        &self.url
    }

    fn revision(&self) -> &str {
        &self.revision
    }

    fn nested_repositories(&self) -> &[String] {
        &self.nested
    }
}

#[derive(Debug, Default)]
struct ScriptedVcs {
    /// `(url, requested revision)` to pinned revision.
    revisions: HashMap<(String, String), String>,
    /// Working trees by root directory.
    trees: HashMap<PathBuf, ScriptedTree>,
    /// Directories whose working tree cannot be opened.
    broken: HashSet<PathBuf>,
    /// URLs whose revisions take this long to resolve.
    slow: HashMap<String, Duration>,
    resolve_calls: AtomicUsize,
    checkout_calls: AtomicUsize,
}

impl ScriptedVcs {
    fn pin(mut self, url: &str, requested: &str, resolved: &str) -> Self {
        self.revisions
            .insert((url.to_string(), requested.to_string()), resolved.to_string());
        self
    }

    fn tree(mut self, root: &str, url: &str, revision: &str, nested: &[&str]) -> Self {
        self.trees.insert(
            PathBuf::from(root),
            ScriptedTree {
                root: PathBuf::from(root),
                url: url.to_string(),
                revision: revision.to_string(),
                nested: nested.iter().map(ToString::to_string).collect(),
            },
        );
        self
    }

    fn broken(mut self, dir: &str) -> Self {
        self.broken.insert(PathBuf::from(dir));
        self
    }

    fn slow(mut self, url: &str, delay: Duration) -> Self {
        self.slow.insert(url.to_string(), delay);
        self
    }
}

#[async_trait]
impl VersionControlSystem for ScriptedVcs {
    fn vcs_type(&self) -> VcsType {
        VcsType::Git
    }

    fn is_applicable_url(&self, _url: &str) -> bool {
        true
    }

    async fn for_directory(&self, path: &Path) -> Result<Option<Arc<dyn WorkingTree>>, VcsError> {
        if self.broken.contains(path) {
            return Err(VcsError::Git(format!("corrupt repository at {}", path.display())));
        }
        Ok(self
            .trees
            .get(path)
            .map(|tree| Arc::new(tree.clone()) as Arc<dyn WorkingTree>))
    }

    async fn resolve_revision(&self, vcs: &VcsInfo) -> Result<String, VcsError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.slow.get(&vcs.url) {
            tokio::time::sleep(*delay).await;
        }
        self.revisions
            .get(&(vcs.url.clone(), vcs.revision.clone()))
            .cloned()
            .ok_or_else(|| VcsError::RevisionNotFound {
                url: vcs.url.clone(),
                revision: vcs.revision.clone(),
            })
    }

    async fn checkout(
        &self,
        vcs: &VcsInfo,
        revision: &str,
    ) -> Result<Arc<dyn WorkingTree>, VcsError> {
        self.checkout_calls.fetch_add(1, Ordering::SeqCst);
        self.trees
            .values()
            .find(|tree| tree.url == vcs.url && tree.revision == revision)
            .map(|tree| Arc::new(tree.clone()) as Arc<dyn WorkingTree>)
            .ok_or_else(|| VcsError::Git(format!("cannot check out {} at {revision}", vcs.url)))
    }
}

#[derive(Debug, Default)]
struct ScriptedDownloader {
    available: HashSet<String>,
    fetches: AtomicUsize,
    broken_fetch: bool,
}

impl ScriptedDownloader {
    fn serving(urls: &[&str]) -> Self {
        Self {
            available: urls.iter().map(ToString::to_string).collect(),
            fetches: AtomicUsize::new(0),
            broken_fetch: false,
        }
    }
}

#[async_trait]
impl Downloader for ScriptedDownloader {
    async fn is_available(&self, artifact: &RemoteArtifact) -> bool {
        self.available.contains(&artifact.url)
    }

    async fn fetch(
        &self,
        artifact: &RemoteArtifact,
        target_dir: &Path,
    ) -> Result<PathBuf, VcsError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.broken_fetch || !self.available.contains(&artifact.url) {
            return Err(VcsError::Unsupported(artifact.url.clone()));
        }
        let target = target_dir.join("artifact");
        std::fs::write(&target, artifact.url.as_bytes())?;
        Ok(target)
    }
}

fn git(url: &str, revision: &str) -> VcsInfo {
    VcsInfo::new(VcsType::Git, url, revision, "")
}

fn artifact(url: &str) -> RemoteArtifact {
    RemoteArtifact::new(url, Hash::NONE)
}

fn package_resolver(
    vcs: Arc<ScriptedVcs>,
    available: &[&str],
) -> PackageProvenanceResolver {
    PackageProvenanceResolver::new(
        VcsRegistry::new().with(vcs),
        Arc::new(ScriptedDownloader::serving(available)),
    )
}

// ── Package provenance ─────────────────────────────────────────────

#[tokio::test]
async fn repository_is_preferred_and_revisions_stay_distinct() {
    let vcs = Arc::new(ScriptedVcs::default().pin("https://github.com/oss/a", "v1.0", SHA_A));
    let resolver = package_resolver(vcs, &["https://dl.example.org/a-1.0.tgz"]);
    let id = Identifier::from("NPM::a:1.0");

    let provenance = resolver
        .resolve(
            &id,
            &git("https://github.com/oss/a", ""),
            Some(&artifact("https://dl.example.org/a-1.0.tgz")),
        )
        .await;

    let Some(KnownProvenance::Repository(repository)) = provenance.provenance() else {
        panic!("expected a repository provenance, got {provenance:?}");
    };
    assert_eq!(repository.requested_revision(), "v1.0");
    assert_eq!(repository.resolved_revision, SHA_A);
    assert!(provenance.issue().is_none());
}

#[tokio::test]
async fn artifact_is_used_when_repository_fails() {
    let vcs = Arc::new(ScriptedVcs::default());
    let resolver = package_resolver(vcs, &["https://dl.example.org/b-2.0.tgz"]);

    let provenance = resolver
        .resolve(
            &Identifier::from("NPM::b:2.0"),
            &git("https://github.com/oss/b", "v2.0"),
            Some(&artifact("https://dl.example.org/b-2.0.tgz")),
        )
        .await;

    assert!(matches!(
        provenance.provenance(),
        Some(KnownProvenance::Artifact(_))
    ));
}

#[tokio::test]
async fn origin_order_is_configurable() {
    let vcs = Arc::new(ScriptedVcs::default().pin("https://github.com/oss/c", "v1", SHA_C));
    let resolver = package_resolver(vcs, &["https://dl.example.org/c-1.tgz"])
        .with_origins(vec![SourceCodeOrigin::Artifact, SourceCodeOrigin::Vcs]);

    let provenance = resolver
        .resolve(
            &Identifier::from("NPM::c:1"),
            &git("https://github.com/oss/c", "v1"),
            Some(&artifact("https://dl.example.org/c-1.tgz")),
        )
        .await;

    assert!(matches!(
        provenance.provenance(),
        Some(KnownProvenance::Artifact(_))
    ));
}

#[tokio::test]
async fn failing_every_origin_yields_an_issue() {
    let vcs = Arc::new(ScriptedVcs::default());
    let resolver = package_resolver(vcs, &[]);

    let provenance = resolver
        .resolve(
            &Identifier::from("NPM::d:1"),
            &git("https://github.com/oss/d", "main"),
            Some(&artifact("https://dl.example.org/d-1.tgz")),
        )
        .await;

    assert!(provenance.provenance().is_none());
    let issue = provenance.issue().unwrap();
    assert!(issue.message.contains("vcs:"), "{}", issue.message);
    assert!(issue.message.contains("artifact:"), "{}", issue.message);
}

#[tokio::test]
async fn same_input_yields_equal_provenance() {
    let vcs = Arc::new(ScriptedVcs::default().pin("https://github.com/oss/e", "v1", SHA_A));
    let resolver = package_resolver(vcs, &[]);
    let id = Identifier::from("NPM::e:1");
    let input = git("https://github.com/oss/e", "v1");

    let first = resolver.resolve(&id, &input, None).await;
    let second = resolver.resolve(&id, &input, None).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn pinned_results_are_served_from_the_cache() {
    let store = Arc::new(MemoryStorage::new());
    let url = "https://github.com/oss/f";

    let vcs = Arc::new(ScriptedVcs::default().pin(url, SHA_B, SHA_B).pin(url, "main", SHA_B));
    let resolver = package_resolver(Arc::clone(&vcs), &[])
        .with_cache(ProvenanceCache::new(store.clone()));
    let id = Identifier::from("NPM::f:1");

    let first = resolver.resolve(&id, &git(url, SHA_B), None).await;
    let second = resolver.resolve(&id, &git(url, SHA_B), None).await;
    assert_eq!(first, second);
    assert_eq!(vcs.resolve_calls.load(Ordering::SeqCst), 1);

    // Symbolic revisions can move, so they are always resolved again.
    resolver.resolve(&id, &git(url, "main"), None).await;
    resolver.resolve(&id, &git(url, "main"), None).await;
    assert_eq!(vcs.resolve_calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn artifacts_are_fetched_into_the_source_store_once() {
    let url = "https://dl.example.org/g-1.0.tgz";
    let sources = Arc::new(MemoryStorage::new());
    let downloader = Arc::new(ScriptedDownloader::serving(&[url]));
    let resolver = PackageProvenanceResolver::new(
        VcsRegistry::new().with(Arc::new(ScriptedVcs::default())),
        Arc::clone(&downloader) as Arc<dyn Downloader>,
    )
    .with_source_store(sources.clone());
    let id = Identifier::from("NPM::g:1.0");

    let first = resolver.resolve(&id, &VcsInfo::default(), Some(&artifact(url))).await;
    let second = resolver.resolve(&id, &VcsInfo::default(), Some(&artifact(url))).await;

    assert_eq!(first, second);
    let Some(provenance) = first.provenance() else {
        panic!("expected an artifact provenance, got {first:?}");
    };
    assert_eq!(sources.read_bytes(&provenance.storage_key()).unwrap(), url.as_bytes());
    assert_eq!(downloader.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_fetch_fails_the_artifact_origin() {
    let url = "https://dl.example.org/h-1.0.tgz";
    let resolver = PackageProvenanceResolver::new(
        VcsRegistry::new().with(Arc::new(ScriptedVcs::default())),
        Arc::new(ScriptedDownloader {
            broken_fetch: true,
            ..ScriptedDownloader::serving(&[url])
        }),
    )
    .with_source_store(Arc::new(MemoryStorage::new()));

    let provenance = resolver
        .resolve(&Identifier::from("NPM::h:1.0"), &VcsInfo::default(), Some(&artifact(url)))
        .await;

    assert!(provenance.provenance().is_none());
    let issue = provenance.issue().unwrap();
    assert!(issue.message.contains("fetching"), "{}", issue.message);
}

// ── Nested provenance ──────────────────────────────────────────────

fn root_provenance(url: &str, revision: &str) -> RepositoryProvenance {
    RepositoryProvenance::new(git(url, "main"), revision)
}

#[tokio::test]
async fn one_failing_sub_repository_keeps_its_siblings() {
    let vcs = ScriptedVcs::default()
        .tree("/co/root", "https://github.com/oss/root", SHA_A, &["a", "b", "c"])
        .tree("/co/root/a", "https://github.com/oss/sub-a", SHA_B, &["inner"])
        .tree("/co/root/a/inner", "https://github.com/oss/inner", SHA_C, &[])
        .broken("/co/root/b")
        .tree("/co/root/c", "https://github.com/oss/sub-c", SHA_C, &[]);
    let resolver = NestedProvenanceResolver::new(VcsRegistry::new().with(Arc::new(vcs)), 4);

    let nested = resolver
        .resolve(&root_provenance("https://github.com/oss/root", SHA_A))
        .await;

    let paths: Vec<&str> = nested.nested_provenance.keys().map(String::as_str).collect();
    assert_eq!(paths, vec!["a", "a/inner", "c"]);
    assert_eq!(nested.nested_provenance["a"].resolved_revision, SHA_B);
    let issue = nested.issue.as_ref().expect("partial result must carry an issue");
    assert!(issue.message.contains("b: "), "{}", issue.message);
    assert!(issue.message.starts_with("Could not resolve 1 nested"), "{}", issue.message);
}

#[tokio::test]
async fn complete_listing_has_no_issue() {
    let vcs = ScriptedVcs::default()
        .tree("/co/root", "https://github.com/oss/root", SHA_A, &["x"])
        .tree("/co/root/x", "https://github.com/oss/x", SHA_B, &[]);
    let resolver = NestedProvenanceResolver::new(VcsRegistry::new().with(Arc::new(vcs)), 2);

    let nested = resolver
        .resolve(&root_provenance("https://github.com/oss/root", SHA_A))
        .await;

    assert!(nested.is_complete());
    assert_eq!(nested.nested_provenance.len(), 1);
    assert_eq!(
        nested.nested_provenance["x"].vcs_info.url,
        "https://github.com/oss/x"
    );
}

#[tokio::test]
async fn ancestor_repositories_are_not_revisited() {
    let vcs = ScriptedVcs::default()
        .tree("/co/root", "https://github.com/oss/root.git", SHA_A, &["loop"])
        .tree("/co/root/loop", "https://github.com/oss/root", SHA_A, &[]);
    let resolver = NestedProvenanceResolver::new(VcsRegistry::new().with(Arc::new(vcs)), 2);

    let nested = resolver
        .resolve(&root_provenance("https://github.com/oss/root.git", SHA_A))
        .await;

    assert!(nested.nested_provenance.is_empty());
    let issue = nested.issue.unwrap();
    assert!(issue.message.contains("own ancestors"), "{}", issue.message);
}

#[tokio::test]
async fn nesting_depth_is_bounded() {
    let vcs = ScriptedVcs::default()
        .tree("/co/root", "https://github.com/oss/root", SHA_A, &["l1"])
        .tree("/co/root/l1", "https://github.com/oss/l1", SHA_B, &["l2"])
        .tree("/co/root/l1/l2", "https://github.com/oss/l2", SHA_C, &["l3"])
        .tree("/co/root/l1/l2/l3", "https://github.com/oss/l3", SHA_C, &[]);
    let resolver =
        NestedProvenanceResolver::new(VcsRegistry::new().with(Arc::new(vcs)), 2).with_max_depth(2);

    let nested = resolver
        .resolve(&root_provenance("https://github.com/oss/root", SHA_A))
        .await;

    let paths: Vec<&str> = nested.nested_provenance.keys().map(String::as_str).collect();
    assert_eq!(paths, vec!["l1", "l1/l2"]);
    assert!(nested.issue.unwrap().message.contains("l1/l2/l3"));
}

#[tokio::test]
async fn failed_root_checkout_is_an_issue() {
    let resolver =
        NestedProvenanceResolver::new(VcsRegistry::new().with(Arc::new(ScriptedVcs::default())), 2);

    let nested = resolver
        .resolve(&root_provenance("https://github.com/oss/missing", SHA_A))
        .await;

    assert!(nested.nested_provenance.is_empty());
    assert!(nested.issue.unwrap().message.contains("Could not check out"));
}

#[tokio::test]
async fn complete_nested_results_are_cached() {
    let store = Arc::new(MemoryStorage::new());
    let vcs = Arc::new(
        ScriptedVcs::default()
            .tree("/co/root", "https://github.com/oss/root", SHA_A, &["x"])
            .tree("/co/root/x", "https://github.com/oss/x", SHA_B, &[]),
    );
    let resolver = NestedProvenanceResolver::new(VcsRegistry::new().with(vcs.clone()), 2)
        .with_cache(ProvenanceCache::new(store));
    let root = root_provenance("https://github.com/oss/root", SHA_A);

    let first = resolver.resolve(&root).await;
    let second = resolver.resolve(&root).await;

    assert_eq!(first, second);
    assert_eq!(vcs.checkout_calls.load(Ordering::SeqCst), 1);
}

// ── Whole result ───────────────────────────────────────────────────

fn analyzer_result() -> AnalyzerResult {
    let project = Project::builder(Identifier::from("Unmanaged::demo:"))
        .vcs(git("https://github.com/oss/root", "main"))
        .scope(Scope::new("main", []))
        .build()
        .unwrap();
    let fast = Package::builder(Identifier::from("NPM::fast:1"))
        .vcs(git("https://github.com/oss/fast", "v1"))
        .build()
        .unwrap();
    let slow = Package::builder(Identifier::from("NPM::slow:1"))
        .vcs(git("https://github.com/oss/slow", "v1"))
        .build()
        .unwrap();

    AnalyzerResult {
        projects: [project].into_iter().collect(),
        packages: [fast, slow]
            .into_iter()
            .map(|package| (package.id.clone(), package))
            .collect(),
        issues: BTreeMap::new(),
    }
}

#[tokio::test]
async fn timeout_only_affects_the_slow_identifier() {
    let vcs = Arc::new(
        ScriptedVcs::default()
            .pin("https://github.com/oss/root", "main", SHA_A)
            .pin("https://github.com/oss/fast", "v1", SHA_B)
            .pin("https://github.com/oss/slow", "v1", SHA_C)
            .slow("https://github.com/oss/slow", Duration::from_secs(30))
            .tree("/co/root", "https://github.com/oss/root", SHA_A, &[])
            .tree("/co/fast", "https://github.com/oss/fast", SHA_B, &[]),
    );
    let registry = VcsRegistry::new().with(vcs);
    let resolver = ProvenanceResolver::new(
        PackageProvenanceResolver::new(registry.clone(), Arc::new(ScriptedDownloader::default())),
        NestedProvenanceResolver::new(registry, 2),
    )
    .with_max_concurrency(2)
    .with_timeout(Duration::from_millis(200));

    let mut package_events = 0;
    let mut nested_events = 0;
    let result = resolver
        .resolve_all(&analyzer_result(), |event| match event {
            Progress::Package(_) => package_events += 1,
            Progress::Nested(_) => nested_events += 1,
        })
        .await;

    assert_eq!(package_events, 3);
    assert_eq!(nested_events, 2);

    let ids: Vec<String> = result
        .package_provenances
        .iter()
        .map(|p| p.id().to_string())
        .collect();
    assert_eq!(ids, vec!["NPM::fast:1", "NPM::slow:1", "Unmanaged::demo:"]);

    let slow = result
        .package_provenance(&Identifier::from("NPM::slow:1"))
        .unwrap();
    assert!(slow.issue().unwrap().message.contains("timed out"));
    assert!(
        result
            .package_provenance(&Identifier::from("NPM::fast:1"))
            .unwrap()
            .is_resolved()
    );
    assert!(
        result
            .package_provenance(&Identifier::from("Unmanaged::demo:"))
            .unwrap()
            .is_resolved()
    );
    assert!(result.nested_provenances.iter().all(|nested| nested.is_complete()));
}
