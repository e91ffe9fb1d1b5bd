use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::identifier::Identifier;
use crate::scope::Scope;
use crate::vcs::VcsInfo;

/// A first-party project and its scoped dependency trees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    pub id: Identifier,
    /// Path of the definition file relative to the repository root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub definition_file_path: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub declared_licenses: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "VcsInfo::is_empty")]
    pub vcs: VcsInfo,
    #[serde(default, skip_serializing_if = "VcsInfo::is_empty")]
    pub vcs_processed: VcsInfo,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub homepage_url: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub scope_dependencies: BTreeSet<Scope>,
}

impl Project {
    #[must_use]
    pub fn builder(id: Identifier) -> ProjectBuilder {
        ProjectBuilder::new(id)
    }

    #[must_use]
    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.scope_dependencies.iter().find(|scope| scope.name == name)
    }

    #[must_use]
    pub fn scope_names(&self) -> Vec<&str> {
        self.scope_dependencies
            .iter()
            .map(|scope| scope.name.as_str())
            .collect()
    }

    /// Every identifier reachable from any scope.
    #[must_use]
    pub fn collect_dependencies(&self) -> BTreeSet<Identifier> {
        self.scope_dependencies
            .iter()
            .flat_map(Scope::collect_ids)
            .collect()
    }
}

/// Builder for [`Project`]. Rejects duplicate scope names on [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ProjectBuilder {
    id: Identifier,
    definition_file_path: String,
    declared_licenses: BTreeSet<String>,
    vcs: VcsInfo,
    vcs_processed: Option<VcsInfo>,
    homepage_url: String,
    scopes: Vec<Scope>,
}

impl ProjectBuilder {
    #[must_use]
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            definition_file_path: String::new(),
            declared_licenses: BTreeSet::new(),
            vcs: VcsInfo::default(),
            vcs_processed: None,
            homepage_url: String::new(),
            scopes: Vec::new(),
        }
    }

    #[must_use]
    pub fn definition_file_path(mut self, path: impl Into<String>) -> Self {
        self.definition_file_path = path.into();
        self
    }

    #[must_use]
    pub fn declared_license(mut self, license: impl Into<String>) -> Self {
        self.declared_licenses.insert(license.into());
        self
    }

    #[must_use]
    pub fn vcs(mut self, vcs: VcsInfo) -> Self {
        self.vcs = vcs;
        self
    }

    #[must_use]
    pub fn vcs_processed(mut self, vcs: VcsInfo) -> Self {
        self.vcs_processed = Some(vcs);
        self
    }

    #[must_use]
    pub fn homepage_url(mut self, url: impl Into<String>) -> Self {
        self.homepage_url = url.into();
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scopes.push(scope);
        self
    }

    #[must_use]
    pub fn scopes(mut self, scopes: impl IntoIterator<Item = Scope>) -> Self {
        self.scopes.extend(scopes);
        self
    }

    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the identifier is invalid or two
    /// scopes share a name.
    pub fn build(self) -> Result<Project, CoreError> {
        self.id.validate()?;

        let mut names = BTreeSet::new();
        for scope in &self.scopes {
            if !names.insert(scope.name.as_str()) {
                return Err(CoreError::Validation(format!(
                    "project '{}' declares scope '{}' more than once",
                    self.id, scope.name
                )));
            }
        }

        let vcs_processed = self.vcs_processed.unwrap_or_else(|| self.vcs.normalize());
        Ok(Project {
            id: self.id,
            definition_file_path: self.definition_file_path,
            declared_licenses: self.declared_licenses,
            vcs: self.vcs,
            vcs_processed,
            homepage_url: self.homepage_url,
            scope_dependencies: self.scopes.into_iter().collect(),
        })
    }
}
