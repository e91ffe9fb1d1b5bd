//! Scopes and the dependency trees they hold.
//!
//! Trees only carry identifiers and linkage. Package metadata lives once in the
//! flat package set of [`crate::AnalyzerResult`], so the same package can sit at
//! many tree positions without being duplicated.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::identifier::Identifier;

/// How a dependency is linked into its consumer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageLinkage {
    #[default]
    Dynamic,
    Static,
    ProjectDynamic,
    ProjectStatic,
}

impl PackageLinkage {
    #[must_use]
    pub const fn is_project_linkage(self) -> bool {
        matches!(self, Self::ProjectDynamic | Self::ProjectStatic)
    }
}

/// A node in a dependency tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct PackageReference {
    pub id: Identifier,
    #[serde(default)]
    pub linkage: PackageLinkage,
    /// Direct dependencies of this node.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dependencies: BTreeSet<PackageReference>,
}

impl PackageReference {
    #[must_use]
    pub const fn new(id: Identifier, linkage: PackageLinkage) -> Self {
        Self {
            id,
            linkage,
            dependencies: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = Self>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Whether `id` is this node or any node below it.
    #[must_use]
    pub fn contains(&self, id: &Identifier) -> bool {
        &self.id == id || self.dependencies.iter().any(|dep| dep.contains(id))
    }

    /// Collect the identifiers of this node and every node below it.
    pub fn collect_ids(&self, ids: &mut BTreeSet<Identifier>) {
        ids.insert(self.id.clone());
        for dep in &self.dependencies {
            dep.collect_ids(ids);
        }
    }

    /// Number of levels below this node (0 for a leaf).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.dependencies
            .iter()
            .map(|dep| dep.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

/// A named partition of a project's dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct Scope {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dependencies: BTreeSet<PackageReference>,
}

impl Scope {
    #[must_use]
    pub fn new(name: impl Into<String>, dependencies: impl IntoIterator<Item = PackageReference>) -> Self {
        Self {
            name: name.into(),
            dependencies: dependencies.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Whether `id` appears anywhere in this scope's trees.
    #[must_use]
    pub fn contains(&self, id: &Identifier) -> bool {
        self.dependencies.iter().any(|dep| dep.contains(id))
    }

    /// All identifiers reachable from this scope.
    #[must_use]
    pub fn collect_ids(&self) -> BTreeSet<Identifier> {
        let mut ids = BTreeSet::new();
        for dep in &self.dependencies {
            dep.collect_ids(&mut ids);
        }
        ids
    }
}
