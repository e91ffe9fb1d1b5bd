//! The simple definition file: a project and its dependencies written down by
//! hand instead of being extracted from a package manager.

use std::collections::BTreeSet;
use std::path::Path;

use lineage_core::{
    CoreError, Hash, Identifier, Package, PackageLinkage, RemoteArtifact, VcsInfo, VcsType,
    format,
};
use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;

/// A project definition in JSON or TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleDefinitionFile {
    pub name: String,
    pub vcs_type: Option<VcsType>,
    pub vcs_url: String,
    pub vcs_revision: String,
    pub vcs_path: String,
    pub dependencies: Vec<DependencyDescriptor>,
}

/// One dependency of the defined project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDescriptor {
    pub id: Identifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_type: Option<VcsType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_artifact_url: Option<String>,
    /// Put the dependency into the excluded scope.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_excluded: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_dynamically_linked: bool,
    /// Identifiers of the dependencies of this dependency. Each must be
    /// described in the same file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Identifier>,
}

impl SimpleDefinitionFile {
    /// Read a definition from `path`; the format follows the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Core`] if the file cannot be read or parsed.
    pub fn read(path: &Path) -> Result<Self, AnalyzerError> {
        let definition: Self = format::read_value(path)?;
        tracing::debug!(
            path = %path.display(),
            dependencies = definition.dependencies.len(),
            "read simple definition file"
        );
        Ok(definition)
    }

    /// Identifier of the single project the file defines.
    #[must_use]
    pub fn project_id(&self) -> Identifier {
        Identifier::new("Unmanaged", "", self.name.trim(), "")
    }

    /// Repository of the project as written in the file.
    #[must_use]
    pub fn vcs(&self) -> VcsInfo {
        VcsInfo::new(
            self.vcs_type.unwrap_or_default(),
            self.vcs_url.as_str(),
            self.vcs_revision.as_str(),
            self.vcs_path.as_str(),
        )
    }

    /// Check every descriptor, collecting all problems.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Validation`] listing every descriptor without
    /// an ecosystem or name, and every child identifier that is not described
    /// in the file.
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("the project has no name".to_string());
        }

        let known: BTreeSet<&Identifier> = self.dependencies.iter().map(|dep| &dep.id).collect();
        for (index, dependency) in self.dependencies.iter().enumerate() {
            if let Err(error) = dependency.id.validate() {
                problems.push(format!("dependency #{index}: {error}"));
            }
            for child in &dependency.dependencies {
                if !known.contains(child) {
                    problems.push(format!(
                        "dependency #{index} ('{}') depends on '{child}', which is not defined",
                        dependency.id
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AnalyzerError::Validation(problems))
        }
    }
}

impl DependencyDescriptor {
    #[must_use]
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            vcs_type: None,
            vcs_url: None,
            vcs_revision: None,
            vcs_path: None,
            source_artifact_url: None,
            is_excluded: false,
            is_dynamically_linked: false,
            dependencies: Vec::new(),
        }
    }

    #[must_use]
    pub fn vcs(&self) -> VcsInfo {
        VcsInfo::new(
            self.vcs_type.unwrap_or_default(),
            self.vcs_url.clone().unwrap_or_default(),
            self.vcs_revision.clone().unwrap_or_default(),
            self.vcs_path.clone().unwrap_or_default(),
        )
    }

    /// Static unless declared dynamically linked.
    #[must_use]
    pub const fn linkage(&self) -> PackageLinkage {
        if self.is_dynamically_linked {
            PackageLinkage::Dynamic
        } else {
            PackageLinkage::Static
        }
    }

    /// The package this descriptor stands for. Source artifacts carry no hash.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the identifier is invalid.
    pub fn to_package(&self) -> Result<Package, CoreError> {
        let mut builder = Package::builder(self.id.clone()).vcs(self.vcs());
        if let Some(url) = self
            .source_artifact_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
        {
            builder = builder.source_artifact(RemoteArtifact::new(url.trim(), Hash::NONE));
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_json_with_defaults() {
        let json = r#"{
            "name": "demo",
            "vcs_type": "Git",
            "vcs_url": "https://github.com/acme/demo.git",
            "dependencies": [
                { "id": "NPM::left-pad:1.3.0", "source_artifact_url": "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz" },
                { "id": "NPM::mocha:10.0.0", "is_excluded": true, "is_dynamically_linked": true }
            ]
        }"#;
        let definition: SimpleDefinitionFile = serde_json::from_str(json).unwrap();

        assert_eq!(definition.project_id().to_string(), "Unmanaged::demo:");
        assert_eq!(definition.vcs().vcs_type, VcsType::Git);
        assert_eq!(definition.dependencies[0].linkage(), PackageLinkage::Static);
        assert_eq!(definition.dependencies[1].linkage(), PackageLinkage::Dynamic);
        assert!(definition.dependencies[1].is_excluded);
        assert!(definition.validate().is_ok());
    }

    #[test]
    fn package_keeps_vcs_and_normalizes_it() {
        let mut descriptor = DependencyDescriptor::new(Identifier::from("NPM::a:1"));
        descriptor.vcs_type = Some(VcsType::Git);
        descriptor.vcs_url = Some("git@github.com:acme/a.git".to_string());
        descriptor.source_artifact_url = Some(" https://dl.example.org/a-1.tgz ".to_string());

        let package = descriptor.to_package().unwrap();
        assert_eq!(package.vcs.url, "git@github.com:acme/a.git");
        assert_eq!(package.vcs_processed.url, "https://github.com/acme/a");
        let artifact = package.source_artifact.unwrap();
        assert_eq!(artifact.url, "https://dl.example.org/a-1.tgz");
        assert!(artifact.hash.is_none());
    }

    #[test]
    fn validation_reports_every_problem() {
        let mut broken = DependencyDescriptor::new(Identifier::from("NPM::ok:1"));
        broken.dependencies.push(Identifier::from("NPM::ghost:1"));
        let definition = SimpleDefinitionFile {
            name: "demo".to_string(),
            dependencies: vec![
                DependencyDescriptor::new(Identifier::from(":::1")),
                broken,
                DependencyDescriptor::new(Identifier::from("NPM:::2")),
            ],
            ..SimpleDefinitionFile::default()
        };

        let Err(AnalyzerError::Validation(problems)) = definition.validate() else {
            panic!("definition must be rejected");
        };
        assert_eq!(problems.len(), 3);
        assert!(problems[0].starts_with("dependency #0"));
        assert!(problems[1].contains("NPM::ghost:1"));
        assert!(problems[2].starts_with("dependency #2"));
    }
}
