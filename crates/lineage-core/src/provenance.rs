//! Provenance value types: where the source code of a package verifiably
//! comes from.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::CoreError;
use crate::hash::RemoteArtifact;
use crate::identifier::{Identifier, path_segment};
use crate::issue::Issue;
use crate::vcs::VcsInfo;

// ── Known provenance ───────────────────────────────────────────────

/// A repository checkout pinned to a concrete revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct RepositoryProvenance {
    /// Repository reference as requested; `vcs_info.revision` is the
    /// requested, possibly symbolic revision.
    pub vcs_info: VcsInfo,
    /// Concrete revision the requested one resolved to.
    pub resolved_revision: String,
}

impl RepositoryProvenance {
    #[must_use]
    pub fn new(vcs_info: VcsInfo, resolved_revision: impl Into<String>) -> Self {
        Self {
            vcs_info,
            resolved_revision: resolved_revision.into(),
        }
    }

    #[must_use]
    pub fn requested_revision(&self) -> &str {
        &self.vcs_info.revision
    }

    /// Identity of the repository at its pinned revision, ignoring the path.
    ///
    /// Two provenances with the same key describe the same checkout.
    #[must_use]
    pub fn checkout_key(&self) -> (String, String) {
        (
            crate::vcs::normalize_vcs_url(&self.vcs_info.url),
            self.resolved_revision.clone(),
        )
    }

    /// Storage key of this checkout: `repository/<type>/<url>/<revision>[/<path>]`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        let vcs_type = self.vcs_info.vcs_type.as_str();
        let mut key = format!(
            "repository/{}/{}/{}",
            path_segment(vcs_type),
            path_segment(&crate::vcs::normalize_vcs_url(&self.vcs_info.url)),
            path_segment(&self.resolved_revision),
        );
        let path = self.vcs_info.path.trim_matches('/');
        if !path.is_empty() {
            key.push('/');
            key.push_str(&path_segment(path));
        }
        key
    }
}

/// A downloaded source artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct ArtifactProvenance {
    pub source_artifact: RemoteArtifact,
}

impl ArtifactProvenance {
    #[must_use]
    pub const fn new(source_artifact: RemoteArtifact) -> Self {
        Self { source_artifact }
    }

    /// Storage key of this artifact: `artifact/<url>[/<hash>]`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        let mut key = format!("artifact/{}", path_segment(&self.source_artifact.url));
        if !self.source_artifact.hash.is_none() {
            key.push('/');
            key.push_str(&path_segment(&self.source_artifact.hash.value));
        }
        key
    }
}

/// Provenance that is known to be valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KnownProvenance {
    Repository(RepositoryProvenance),
    Artifact(ArtifactProvenance),
}

impl KnownProvenance {
    /// Fingerprint usable as an artifact store key by downstream stages.
    #[must_use]
    pub fn storage_key(&self) -> String {
        match self {
            Self::Repository(repository) => repository.storage_key(),
            Self::Artifact(artifact) => artifact.storage_key(),
        }
    }

    #[must_use]
    pub const fn as_repository(&self) -> Option<&RepositoryProvenance> {
        match self {
            Self::Repository(repository) => Some(repository),
            Self::Artifact(_) => None,
        }
    }
}

impl From<RepositoryProvenance> for KnownProvenance {
    fn from(value: RepositoryProvenance) -> Self {
        Self::Repository(value)
    }
}

impl From<ArtifactProvenance> for KnownProvenance {
    fn from(value: ArtifactProvenance) -> Self {
        Self::Artifact(value)
    }
}

/// Kind of source code origin, tried in a configurable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceCodeOrigin {
    Vcs,
    Artifact,
}

impl SourceCodeOrigin {
    pub const DEFAULT_ORDER: [Self; 2] = [Self::Vcs, Self::Artifact];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vcs => "vcs",
            Self::Artifact => "artifact",
        }
    }
}

// ── Package provenance ─────────────────────────────────────────────

/// Outcome of resolving the provenance of one package or project.
///
/// Exactly one of `provenance` and `issue` is present. The fields are private
/// so the invariant can only be established through the constructors (and
/// deserialization, which applies the same check).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct PackageProvenance {
    id: Identifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    provenance: Option<KnownProvenance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issue: Option<Issue>,
}

impl PackageProvenance {
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if both or neither of `provenance`
    /// and `issue` are given.
    pub fn new(
        id: Identifier,
        provenance: Option<KnownProvenance>,
        issue: Option<Issue>,
    ) -> Result<Self, CoreError> {
        if provenance.is_some() == issue.is_some() {
            return Err(CoreError::Validation(format!(
                "provenance of '{id}' must have either a provenance or an issue, but not neither or both"
            )));
        }
        Ok(Self {
            id,
            provenance,
            issue,
        })
    }

    #[must_use]
    pub const fn resolved(id: Identifier, provenance: KnownProvenance) -> Self {
        Self {
            id,
            provenance: Some(provenance),
            issue: None,
        }
    }

    #[must_use]
    pub const fn failed(id: Identifier, issue: Issue) -> Self {
        Self {
            id,
            provenance: None,
            issue: Some(issue),
        }
    }

    #[must_use]
    pub const fn id(&self) -> &Identifier {
        &self.id
    }

    #[must_use]
    pub const fn provenance(&self) -> Option<&KnownProvenance> {
        self.provenance.as_ref()
    }

    #[must_use]
    pub const fn issue(&self) -> Option<&Issue> {
        self.issue.as_ref()
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.provenance.is_some()
    }
}

impl<'de> Deserialize<'de> for PackageProvenance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            id: Identifier,
            #[serde(default)]
            provenance: Option<KnownProvenance>,
            #[serde(default)]
            issue: Option<Issue>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.id, raw.provenance, raw.issue).map_err(serde::de::Error::custom)
    }
}

// ── Nested provenance ──────────────────────────────────────────────

/// A repository together with the sub-repositories nested in its checkout.
///
/// When `issue` is absent the `nested_provenance` mapping is complete. When it
/// is present the mapping holds every sub-repository that did resolve and the
/// issue describes the ones that did not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NestedProvenance {
    /// Provenance of the root repository.
    pub provenance: RepositoryProvenance,
    /// Sub-repositories keyed by their path relative to the root checkout.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nested_provenance: BTreeMap<String, RepositoryProvenance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<Issue>,
}

impl NestedProvenance {
    #[must_use]
    pub const fn new(
        provenance: RepositoryProvenance,
        nested_provenance: BTreeMap<String, RepositoryProvenance>,
        issue: Option<Issue>,
    ) -> Self {
        Self {
            provenance,
            nested_provenance,
            issue,
        }
    }

    /// Whether the nested listing is authoritative.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.issue.is_none()
    }

    /// The root provenance (at path `""`) followed by all nested ones.
    pub fn all_provenances(&self) -> impl Iterator<Item = (&str, &RepositoryProvenance)> {
        std::iter::once(("", &self.provenance)).chain(
            self.nested_provenance
                .iter()
                .map(|(path, provenance)| (path.as_str(), provenance)),
        )
    }
}
