//! # lineage-core
//!
//! Model types shared by every Lineage crate.
//!
//! - [`Identifier`] and the VCS / artifact references a package points at
//! - The dependency graph: projects, scopes, package references and packages
//! - Provenance values: package provenance and nested repository provenance
//! - Issues, the only way resolution failures are reported
//! - The result document passed between pipeline stages, and its file formats

pub mod errors;
pub mod excludes;
pub mod format;
pub mod hash;
pub mod identifier;
pub mod issue;
pub mod package;
pub mod project;
pub mod provenance;
pub mod result;
pub mod scope;
pub mod vcs;

pub use errors::CoreError;
pub use excludes::{Excludes, RepositoryConfiguration, ScopeExclude, ScopeExcludeReason};
pub use format::FileFormat;
pub use hash::{Hash, HashAlgorithm, RemoteArtifact};
pub use identifier::Identifier;
pub use issue::{Issue, Severity};
pub use package::{Package, PackageBuilder};
pub use project::{Project, ProjectBuilder};
pub use provenance::{
    ArtifactProvenance, KnownProvenance, NestedProvenance, PackageProvenance, RepositoryProvenance,
    SourceCodeOrigin,
};
pub use result::{AnalyzerResult, AnalyzerRun, PipelineResult, ProvenanceResult, Repository};
pub use scope::{PackageLinkage, PackageReference, Scope};
pub use vcs::{VcsInfo, VcsType, normalize_vcs_url};
