//! Turning a simple definition file into a result document.

use std::collections::BTreeMap;

use chrono::Utc;
use lineage_core::{
    AnalyzerResult, AnalyzerRun, Excludes, PipelineResult, Project, Repository,
    RepositoryConfiguration, Scope,
};

use crate::definition::SimpleDefinitionFile;
use crate::error::AnalyzerError;
use crate::partition::{
    EXCLUDED_SCOPE_NAME, MAIN_SCOPE_NAME, ScopePartition, first_occurrences, partition_scopes,
};
use crate::tree::{DependencyNode, DependencyTreeBuilder};

/// Build the result document for the project `definition` describes.
///
/// The single project `Unmanaged::<name>:` gets a `main` and an `excluded`
/// scope, every distinct dependency becomes one package, and the repository
/// configuration excludes the `excluded` scope as development dependencies.
/// Nothing is built unless every descriptor is valid.
///
/// # Errors
///
/// Returns [`AnalyzerError::Validation`] if the definition is malformed, or
/// [`AnalyzerError::Core`] if the project cannot be built.
pub fn create_flat_result(definition: &SimpleDefinitionFile) -> Result<PipelineResult, AnalyzerError> {
    let start_time = Utc::now();
    definition.validate()?;

    let partition = partition_scopes(&definition.dependencies, |descriptor| descriptor.is_excluded)?;

    let nodes: BTreeMap<_, _> = first_occurrences(&definition.dependencies)
        .into_iter()
        .map(|(id, descriptor)| {
            (
                id.clone(),
                DependencyNode {
                    linkage: descriptor.linkage(),
                    children: descriptor.dependencies.clone(),
                },
            )
        })
        .collect();
    let mut trees = DependencyTreeBuilder::new(nodes);
    let main = Scope {
        name: MAIN_SCOPE_NAME.to_string(),
        dependencies: trees.build_all(partition.main.iter().map(|descriptor| &descriptor.id)),
    };
    let excluded = Scope {
        name: EXCLUDED_SCOPE_NAME.to_string(),
        dependencies: trees.build_all(partition.excluded.iter().map(|descriptor| &descriptor.id)),
    };

    let vcs = definition.vcs();
    let project = Project::builder(definition.project_id())
        .vcs(vcs.clone())
        .scopes([main, excluded])
        .build()?;

    let mut issues = BTreeMap::new();
    let tree_issues = trees.into_issues();
    if !tree_issues.is_empty() {
        issues.insert(project.id.clone(), tree_issues);
    }

    tracing::info!(
        project = %project.id,
        packages = partition.packages.len(),
        excluded = partition.excluded.len(),
        "created flat analyzer result"
    );

    let ScopePartition { packages, .. } = partition;
    let result = AnalyzerResult {
        projects: [project].into_iter().collect(),
        packages,
        issues,
    };

    Ok(PipelineResult {
        repository: Repository {
            vcs: vcs.normalize(),
            vcs_processed: vcs.normalize(),
            config: RepositoryConfiguration {
                excludes: Excludes {
                    scopes: vec![ScopePartition::scope_exclude()],
                },
            },
        },
        analyzer: AnalyzerRun {
            start_time,
            end_time: Utc::now(),
            result,
        },
        provenance: None,
    })
}
