//! Analyzer error types for lineage-analyzer.

use lineage_core::CoreError;

/// Errors that abort building a dependency graph.
///
/// Nothing is produced when one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// One or more descriptors are malformed. Every problem found is listed.
    #[error("Invalid definition: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Core(#[from] CoreError),
}
