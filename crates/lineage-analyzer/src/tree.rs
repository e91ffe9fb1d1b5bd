//! Dependency trees built from an adjacency description.

use std::collections::{BTreeMap, BTreeSet};

use lineage_core::{Identifier, Issue, PackageLinkage, PackageReference};

pub(crate) const ISSUE_SOURCE: &str = "analyzer";

/// Default bound on the depth of a dependency tree.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 64;

/// Default bound on the number of references built by one builder.
pub const DEFAULT_MAX_TREE_NODES: usize = 100_000;

/// A node of the adjacency description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyNode {
    pub linkage: PackageLinkage,
    pub children: Vec<Identifier>,
}

/// Builds [`PackageReference`] trees from `id -> children` edges.
///
/// Trees only refer to packages by identifier, so a package reachable along
/// many paths is repeated by reference while its metadata stays in the flat
/// package set. An identifier that re-appears among its own ancestors is not
/// descended into again; each such cycle is recorded as a warning. Branches
/// deeper than the depth bound are cut the same way, and once the node budget
/// is spent no further references are added to any tree.
#[derive(Debug, Clone)]
pub struct DependencyTreeBuilder {
    nodes: BTreeMap<Identifier, DependencyNode>,
    max_depth: usize,
    max_nodes: usize,
    built: usize,
    budget_spent: bool,
    issues: Vec<Issue>,
    reported: BTreeSet<(Identifier, Identifier)>,
}

impl DependencyTreeBuilder {
    #[must_use]
    pub fn new(nodes: BTreeMap<Identifier, DependencyNode>) -> Self {
        Self {
            nodes,
            max_depth: DEFAULT_MAX_TREE_DEPTH,
            max_nodes: DEFAULT_MAX_TREE_NODES,
            built: 0,
            budget_spent: false,
            issues: Vec::new(),
            reported: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Bound the total number of references across all trees built.
    #[must_use]
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes.max(1);
        self
    }

    /// The tree rooted at `id`. Unknown identifiers become leaves with the
    /// default linkage.
    pub fn build(&mut self, id: &Identifier) -> PackageReference {
        let mut ancestors = Vec::new();
        self.build_node(id, &mut ancestors)
    }

    /// Trees for every identifier in `roots`.
    pub fn build_all<'a>(
        &mut self,
        roots: impl IntoIterator<Item = &'a Identifier>,
    ) -> BTreeSet<PackageReference> {
        roots.into_iter().map(|id| self.build(id)).collect()
    }

    /// Warnings collected so far.
    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    #[must_use]
    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }

    fn build_node(&mut self, id: &Identifier, ancestors: &mut Vec<Identifier>) -> PackageReference {
        let node = self.nodes.get(id).cloned().unwrap_or_default();
        let mut reference = PackageReference::new(id.clone(), node.linkage);
        self.built += 1;
        if node.children.is_empty() {
            return reference;
        }

        if ancestors.len() + 1 >= self.max_depth {
            self.report(
                id,
                id,
                format!(
                    "Dependencies of '{id}' are nested deeper than {} levels and were cut off",
                    self.max_depth
                ),
            );
            return reference;
        }

        ancestors.push(id.clone());
        for child in &node.children {
            if child == id || ancestors.contains(child) {
                self.report(
                    id,
                    child,
                    format!("Dependency cycle: '{id}' depends on its ancestor '{child}'"),
                );
                continue;
            }
            if self.built >= self.max_nodes {
                self.report_budget(id);
                break;
            }
            let child_reference = self.build_node(child, ancestors);
            reference.dependencies.insert(child_reference);
        }
        ancestors.pop();
        reference
    }

    fn report_budget(&mut self, id: &Identifier) {
        if !self.budget_spent {
            self.budget_spent = true;
            let message = format!(
                "Dependency trees exceed {} references; dependencies of '{id}' and later ones were cut off",
                self.max_nodes
            );
            tracing::warn!(%id, max_nodes = self.max_nodes, "dependency tree truncated");
            self.issues.push(Issue::warning(ISSUE_SOURCE, message));
        }
    }

    fn report(&mut self, from: &Identifier, to: &Identifier, message: String) {
        if self.reported.insert((from.clone(), to.clone())) {
            tracing::warn!(%from, %to, %message, "dependency tree truncated");
            self.issues.push(Issue::warning(ISSUE_SOURCE, message));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn id(name: &str) -> Identifier {
        Identifier::new("NPM", "", name, "1")
    }

    fn graph(edges: &[(&str, &[&str])]) -> BTreeMap<Identifier, DependencyNode> {
        edges
            .iter()
            .map(|(from, to)| {
                (
                    id(from),
                    DependencyNode {
                        linkage: PackageLinkage::Static,
                        children: to.iter().map(|name| id(name)).collect(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn diamonds_repeat_the_shared_node() {
        let mut builder = DependencyTreeBuilder::new(graph(&[
            ("app", &["left", "right"]),
            ("left", &["shared"]),
            ("right", &["shared"]),
            ("shared", &[]),
        ]));

        let tree = builder.build(&id("app"));

        assert_eq!(tree.depth(), 2);
        assert!(tree.dependencies.iter().all(|dep| dep.contains(&id("shared"))));
        assert!(builder.issues().is_empty());
    }

    #[test]
    fn cycles_are_broken_and_reported_once() {
        let mut builder = DependencyTreeBuilder::new(graph(&[
            ("a", &["b"]),
            ("b", &["c"]),
            ("c", &["a"]),
        ]));

        let first = builder.build(&id("a"));
        let second = builder.build(&id("a"));

        assert_eq!(first, second);
        assert_eq!(first.depth(), 2);
        let issues = builder.into_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, lineage_core::Severity::Warning);
        assert!(issues[0].message.contains("'NPM::c:1' depends on its ancestor 'NPM::a:1'"));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut builder = DependencyTreeBuilder::new(graph(&[("a", &["a"])]));
        let tree = builder.build(&id("a"));
        assert!(tree.dependencies.is_empty());
        assert_eq!(builder.issues().len(), 1);
    }

    #[test]
    fn depth_is_bounded() {
        let mut builder = DependencyTreeBuilder::new(graph(&[
            ("a", &["b"]),
            ("b", &["c"]),
            ("c", &["d"]),
            ("d", &[]),
        ]))
        .with_max_depth(2);

        let tree = builder.build(&id("a"));

        assert_eq!(tree.depth(), 1);
        assert_eq!(builder.issues().len(), 1);
        assert!(builder.issues()[0].message.contains("'NPM::b:1'"));
    }

    fn count(reference: &PackageReference) -> usize {
        1 + reference.dependencies.iter().map(count).sum::<usize>()
    }

    #[test]
    fn node_budget_bounds_ladders() {
        // Every rung depends on the next two, so the unbounded tree grows like
        // the Fibonacci numbers while staying well within the depth bound.
        let names: Vec<String> = (0..40).map(|i| format!("rung{i}")).collect();
        let nodes = (0..names.len())
            .map(|i| {
                let children = names.iter().skip(i + 1).take(2).map(|name| id(name)).collect();
                (
                    id(&names[i]),
                    DependencyNode {
                        linkage: PackageLinkage::Static,
                        children,
                    },
                )
            })
            .collect();
        let mut builder = DependencyTreeBuilder::new(nodes).with_max_nodes(500);

        let tree = builder.build(&id("rung0"));
        let again = builder.build(&id("rung1"));

        assert!(count(&tree) <= 500, "{}", count(&tree));
        assert_eq!(count(&again), 1);
        assert_eq!(builder.issues().len(), 1);
        assert!(builder.issues()[0].message.contains("exceed 500 references"));
    }

    #[test]
    fn unknown_identifiers_are_leaves() {
        let mut builder = DependencyTreeBuilder::new(BTreeMap::new());
        let tree = builder.build(&id("lonely"));
        assert_eq!(tree, PackageReference::new(id("lonely"), PackageLinkage::Dynamic));
    }
}
