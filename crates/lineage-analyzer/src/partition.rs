//! Splitting dependency descriptors into the main and the excluded scope.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use lineage_core::{Identifier, Package, ScopeExclude, ScopeExcludeReason};

use crate::definition::DependencyDescriptor;
use crate::error::AnalyzerError;

pub const MAIN_SCOPE_NAME: &str = "main";
pub const EXCLUDED_SCOPE_NAME: &str = "excluded";

/// Reason recorded for every member of the excluded scope.
pub const EXCLUDED_SCOPE_REASON: ScopeExcludeReason = ScopeExcludeReason::DevDependencyOf;

/// Descriptors split by scope, with the package arena they share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePartition<'a> {
    /// One package per distinct identifier.
    pub packages: BTreeMap<Identifier, Package>,
    /// Members of the main scope, in descriptor order.
    pub main: Vec<&'a DependencyDescriptor>,
    /// Members of the excluded scope, in descriptor order.
    pub excluded: Vec<&'a DependencyDescriptor>,
}

impl ScopePartition<'_> {
    /// The exclude covering the excluded scope.
    #[must_use]
    pub fn scope_exclude() -> ScopeExclude {
        ScopeExclude::new(EXCLUDED_SCOPE_NAME, EXCLUDED_SCOPE_REASON)
    }

    /// Why `id` is excluded, if it is a member of the excluded scope.
    #[must_use]
    pub fn exclusion_reason(&self, id: &Identifier) -> Option<ScopeExcludeReason> {
        self.excluded
            .iter()
            .any(|descriptor| &descriptor.id == id)
            .then_some(EXCLUDED_SCOPE_REASON)
    }

    /// Every excluded identifier with the reason it is excluded.
    #[must_use]
    pub fn exclusion_reasons(&self) -> BTreeMap<Identifier, ScopeExcludeReason> {
        self.excluded
            .iter()
            .map(|descriptor| (descriptor.id.clone(), EXCLUDED_SCOPE_REASON))
            .collect()
    }
}

/// Partition `descriptors` into the main and the excluded scope.
///
/// Descriptors matching `is_excluded` go to the excluded scope. When several
/// descriptors share an identifier the first one wins, both for the package
/// and for the scope it lands in; later ones are ignored.
///
/// # Errors
///
/// Returns [`AnalyzerError::Core`] if a descriptor has an invalid identifier.
pub fn partition_scopes<'a>(
    descriptors: &'a [DependencyDescriptor],
    is_excluded: impl Fn(&DependencyDescriptor) -> bool,
) -> Result<ScopePartition<'a>, AnalyzerError> {
    let mut packages = BTreeMap::new();
    let mut main = Vec::new();
    let mut excluded = Vec::new();

    for descriptor in descriptors {
        match packages.entry(descriptor.id.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(id = %descriptor.id, "ignoring duplicate dependency descriptor");
                continue;
            }
            Entry::Vacant(slot) => {
                slot.insert(descriptor.to_package()?);
            }
        }
        if is_excluded(descriptor) {
            excluded.push(descriptor);
        } else {
            main.push(descriptor);
        }
    }

    Ok(ScopePartition {
        packages,
        main,
        excluded,
    })
}

/// Identifiers of the first descriptor of every distinct identifier.
pub(crate) fn first_occurrences(descriptors: &[DependencyDescriptor]) -> BTreeMap<&Identifier, &DependencyDescriptor> {
    let mut seen = BTreeSet::new();
    descriptors
        .iter()
        .filter(|descriptor| seen.insert(&descriptor.id))
        .map(|descriptor| (&descriptor.id, descriptor))
        .collect()
}
