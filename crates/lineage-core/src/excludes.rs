//! Repository configuration: which scopes are excluded and why.

use globset::Glob;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Why the dependencies of a scope are excluded from compliance findings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeExcludeReason {
    BuildDependencyOf,
    DevDependencyOf,
    DocumentationDependencyOf,
    ProvidedDependencyOf,
    TestDependencyOf,
    RuntimeDependencyOf,
}

impl ScopeExcludeReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuildDependencyOf => "BUILD_DEPENDENCY_OF",
            Self::DevDependencyOf => "DEV_DEPENDENCY_OF",
            Self::DocumentationDependencyOf => "DOCUMENTATION_DEPENDENCY_OF",
            Self::ProvidedDependencyOf => "PROVIDED_DEPENDENCY_OF",
            Self::TestDependencyOf => "TEST_DEPENDENCY_OF",
            Self::RuntimeDependencyOf => "RUNTIME_DEPENDENCY_OF",
        }
    }
}

/// Excludes every scope whose name matches `pattern` (a glob).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ScopeExclude {
    pub pattern: String,
    pub reason: ScopeExcludeReason,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl ScopeExclude {
    #[must_use]
    pub fn new(pattern: impl Into<String>, reason: ScopeExcludeReason) -> Self {
        Self {
            pattern: pattern.into(),
            reason,
            comment: String::new(),
        }
    }

    /// Whether `scope_name` matches the pattern. An invalid glob only matches
    /// its literal text.
    #[must_use]
    pub fn matches(&self, scope_name: &str) -> bool {
        match Glob::new(&self.pattern) {
            Ok(glob) => glob.compile_matcher().is_match(scope_name),
            Err(error) => {
                tracing::debug!(pattern = %self.pattern, %error, "invalid scope exclude glob");
                self.pattern == scope_name
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Excludes {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<ScopeExclude>,
}

impl Excludes {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// All scope excludes matching `scope_name`.
    #[must_use]
    pub fn find_scope_excludes(&self, scope_name: &str) -> Vec<&ScopeExclude> {
        self.scopes
            .iter()
            .filter(|exclude| exclude.matches(scope_name))
            .collect()
    }

    #[must_use]
    pub fn is_scope_excluded(&self, scope_name: &str) -> bool {
        self.scopes.iter().any(|exclude| exclude.matches(scope_name))
    }
}

/// Per-repository configuration stored with the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RepositoryConfiguration {
    #[serde(default, skip_serializing_if = "Excludes::is_empty")]
    pub excludes: Excludes,
}
