//! The result document handed from stage to stage.
//!
//! [`PipelineResult`] is serialized losslessly: absent optional fields are
//! omitted, and deserializing a serialized document yields an equal value.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::excludes::RepositoryConfiguration;
use crate::identifier::Identifier;
use crate::issue::Issue;
use crate::package::Package;
use crate::project::Project;
use crate::provenance::{NestedProvenance, PackageProvenance, RepositoryProvenance};
use crate::vcs::VcsInfo;

/// The repository the analyzed projects live in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Repository {
    #[serde(default, skip_serializing_if = "VcsInfo::is_empty")]
    pub vcs: VcsInfo,
    #[serde(default, skip_serializing_if = "VcsInfo::is_empty")]
    pub vcs_processed: VcsInfo,
    #[serde(default)]
    pub config: RepositoryConfiguration,
}

/// The dependency graph: projects plus the flat package arena.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzerResult {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub projects: BTreeSet<Project>,
    /// Packages keyed by identifier, serialized as a list.
    #[serde(default, with = "package_list", skip_serializing_if = "BTreeMap::is_empty")]
    #[schemars(with = "Vec<Package>")]
    pub packages: BTreeMap<Identifier, Package>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub issues: BTreeMap<Identifier, Vec<Issue>>,
}

impl AnalyzerResult {
    #[must_use]
    pub fn project(&self, id: &Identifier) -> Option<&Project> {
        self.projects.iter().find(|project| &project.id == id)
    }

    #[must_use]
    pub fn package(&self, id: &Identifier) -> Option<&Package> {
        self.packages.get(id)
    }

    /// Identifiers of all projects followed by all packages.
    #[must_use]
    pub fn all_identifiers(&self) -> Vec<Identifier> {
        self.projects
            .iter()
            .map(|project| project.id.clone())
            .chain(self.packages.keys().cloned())
            .collect()
    }

    /// Referenced identifiers that have no entry in the package arena.
    #[must_use]
    pub fn dangling_references(&self) -> BTreeSet<Identifier> {
        self.projects
            .iter()
            .flat_map(Project::collect_dependencies)
            .filter(|id| !self.packages.contains_key(id) && self.project(id).is_none())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzerRun {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub result: AnalyzerResult,
}

/// Provenance resolution results for the whole graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProvenanceResult {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// One entry per identifier, sorted by identifier. Documents are re-sorted
    /// on deserialize.
    #[serde(
        default,
        deserialize_with = "sorted_provenances",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub package_provenances: Vec<PackageProvenance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_provenances: Vec<NestedProvenance>,
}

impl ProvenanceResult {
    #[must_use]
    pub fn package_provenance(&self, id: &Identifier) -> Option<&PackageProvenance> {
        self.package_provenances
            .binary_search_by(|entry| entry.id().cmp(id))
            .ok()
            .map(|idx| &self.package_provenances[idx])
    }

    #[must_use]
    pub fn nested_provenance(&self, root: &RepositoryProvenance) -> Option<&NestedProvenance> {
        let key = root.checkout_key();
        self.nested_provenances
            .iter()
            .find(|nested| nested.provenance.checkout_key() == key)
    }

    /// Every issue reported during resolution, with the identifier it belongs to
    /// where there is one.
    #[must_use]
    pub fn issues(&self) -> Vec<(Option<&Identifier>, &Issue)> {
        let package_issues = self
            .package_provenances
            .iter()
            .filter_map(|entry| entry.issue().map(|issue| (Some(entry.id()), issue)));
        let nested_issues = self
            .nested_provenances
            .iter()
            .filter_map(|nested| nested.issue.as_ref().map(|issue| (None, issue)));
        package_issues.chain(nested_issues).collect()
    }
}

/// The document shared by all pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PipelineResult {
    pub repository: Repository,
    pub analyzer: AnalyzerRun,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<ProvenanceResult>,
}

impl PipelineResult {
    /// Whether `id` only occurs in excluded scopes of every project.
    ///
    /// Identifiers that do not occur in any scope are not excluded.
    #[must_use]
    pub fn is_excluded(&self, id: &Identifier) -> bool {
        let excludes = &self.repository.config.excludes;
        let mut seen = false;
        for project in &self.analyzer.result.projects {
            for scope in &project.scope_dependencies {
                if scope.contains(id) {
                    seen = true;
                    if !excludes.is_scope_excluded(&scope.name) {
                        return false;
                    }
                }
            }
        }
        seen
    }
}

fn sorted_provenances<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<PackageProvenance>, D::Error> {
    let mut list = Vec::<PackageProvenance>::deserialize(deserializer)?;
    list.sort_by(|a, b| a.id().cmp(b.id()));
    if let Some(pair) = list.windows(2).find(|pair| pair[0].id() == pair[1].id()) {
        return Err(serde::de::Error::custom(format!(
            "duplicate package provenance '{}'",
            pair[0].id()
        )));
    }
    Ok(list)
}

/// Serialize the package arena as a plain list; the identifier is already
/// part of every package.
mod package_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::identifier::Identifier;
    use crate::package::Package;

    pub fn serialize<S: Serializer>(
        packages: &BTreeMap<Identifier, Package>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(packages.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Identifier, Package>, D::Error> {
        let list = Vec::<Package>::deserialize(deserializer)?;
        let mut packages = BTreeMap::new();
        for package in list {
            if packages.contains_key(&package.id) {
                return Err(serde::de::Error::custom(format!(
                    "duplicate package '{}'",
                    package.id
                )));
            }
            packages.insert(package.id.clone(), package);
        }
        Ok(packages)
    }
}
