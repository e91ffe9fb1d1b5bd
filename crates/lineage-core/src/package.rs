use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::hash::RemoteArtifact;
use crate::identifier::Identifier;
use crate::vcs::VcsInfo;

/// Metadata of a third-party package.
///
/// Built once through [`Package::builder`] and treated as read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct Package {
    pub id: Identifier,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub declared_licenses: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub homepage_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_artifact: Option<RemoteArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_artifact: Option<RemoteArtifact>,
    /// Repository reference as declared by the package metadata.
    #[serde(default, skip_serializing_if = "VcsInfo::is_empty")]
    pub vcs: VcsInfo,
    /// Normalized form of [`Package::vcs`].
    #[serde(default, skip_serializing_if = "VcsInfo::is_empty")]
    pub vcs_processed: VcsInfo,
}

impl Package {
    #[must_use]
    pub fn builder(id: Identifier) -> PackageBuilder {
        PackageBuilder::new(id)
    }

    /// Whether any source origin (repository or artifact) is known.
    #[must_use]
    pub fn has_source_origin(&self) -> bool {
        !self.vcs_processed.url.is_empty()
            || self
                .source_artifact
                .as_ref()
                .is_some_and(|artifact| !artifact.is_empty())
    }
}

/// Builder for [`Package`].
///
/// `vcs_processed` defaults to the normalized `vcs` unless set explicitly.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    id: Identifier,
    declared_licenses: BTreeSet<String>,
    description: String,
    homepage_url: String,
    binary_artifact: Option<RemoteArtifact>,
    source_artifact: Option<RemoteArtifact>,
    vcs: VcsInfo,
    vcs_processed: Option<VcsInfo>,
}

impl PackageBuilder {
    #[must_use]
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            declared_licenses: BTreeSet::new(),
            description: String::new(),
            homepage_url: String::new(),
            binary_artifact: None,
            source_artifact: None,
            vcs: VcsInfo::default(),
            vcs_processed: None,
        }
    }

    #[must_use]
    pub fn declared_license(mut self, license: impl Into<String>) -> Self {
        self.declared_licenses.insert(license.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn homepage_url(mut self, url: impl Into<String>) -> Self {
        self.homepage_url = url.into();
        self
    }

    #[must_use]
    pub fn binary_artifact(mut self, artifact: RemoteArtifact) -> Self {
        self.binary_artifact = (!artifact.is_empty()).then_some(artifact);
        self
    }

    #[must_use]
    pub fn source_artifact(mut self, artifact: RemoteArtifact) -> Self {
        self.source_artifact = (!artifact.is_empty()).then_some(artifact);
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

    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the identifier is invalid.
    pub fn build(self) -> Result<Package, CoreError> {
        self.id.validate()?;
        let vcs_processed = self.vcs_processed.unwrap_or_else(|| self.vcs.normalize());
        Ok(Package {
            id: self.id,
            declared_licenses: self.declared_licenses,
            description: self.description,
            homepage_url: self.homepage_url,
            binary_artifact: self.binary_artifact,
            source_artifact: self.source_artifact,
            vcs: self.vcs,
            vcs_processed,
        })
    }
}
