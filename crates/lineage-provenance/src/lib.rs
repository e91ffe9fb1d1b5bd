//! # lineage-provenance
//!
//! Determines the verified source code origin of every package in a
//! dependency graph.
//!
//! - [`PackageProvenanceResolver`]: one identifier, repository or source artifact
//! - [`NestedProvenanceResolver`]: sub-repositories nested in a root checkout
//! - [`ProvenanceResolver`]: all identifiers of a result on a bounded pool
//! - [`ProvenanceCache`]: results keyed by pinned input in an artifact store
//!
//! Resolution failures are reported as [`lineage_core::Issue`]s on the values
//! returned, never as errors.

pub mod cache;
mod error;
pub mod nested;
pub mod package;
pub mod resolver;

pub use cache::ProvenanceCache;
pub use error::CacheError;
pub use nested::{DEFAULT_MAX_NESTED_DEPTH, NestedProvenanceResolver};
pub use package::{PackageProvenanceResolver, is_pinned_revision, revision_candidates};
pub use resolver::{
    DEFAULT_MAX_CONCURRENCY, DEFAULT_TIMEOUT, Progress, ProvenanceResolver, ResolutionInput,
};
