//! # lineage-analyzer
//!
//! Builds a dependency graph without a package manager: a simple definition
//! file lists the dependencies of one project by hand, and
//! [`create_flat_result`] turns it into a [`lineage_core::PipelineResult`].
//!
//! - [`SimpleDefinitionFile`] / [`DependencyDescriptor`]: the input format
//! - [`partition_scopes`]: main versus excluded dependencies
//! - [`DependencyTreeBuilder`]: cycle-safe dependency trees bounded in depth
//!   and size

mod error;
pub mod definition;
pub mod flat;
pub mod partition;
pub mod tree;

pub use definition::{DependencyDescriptor, SimpleDefinitionFile};
pub use error::AnalyzerError;
pub use flat::create_flat_result;
pub use partition::{
    EXCLUDED_SCOPE_NAME, EXCLUDED_SCOPE_REASON, MAIN_SCOPE_NAME, ScopePartition, partition_scopes,
};
pub use tree::{DEFAULT_MAX_TREE_DEPTH, DEFAULT_MAX_TREE_NODES, DependencyNode, DependencyTreeBuilder};
