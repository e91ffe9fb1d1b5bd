//! Provenance resolution settings.

use std::collections::BTreeSet;
use std::time::Duration;

use lineage_core::SourceCodeOrigin;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const fn default_max_concurrency() -> usize {
    8
}

const fn default_timeout_secs() -> u64 {
    300
}

const fn default_max_nested_depth() -> usize {
    8
}

const fn default_cache_results() -> bool {
    true
}

fn default_source_code_origins() -> Vec<SourceCodeOrigin> {
    SourceCodeOrigin::DEFAULT_ORDER.to_vec()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Identifiers resolved at the same time.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Time budget of a single identifier or root repository.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_nested_depth")]
    pub max_nested_depth: usize,

    /// Keep pinned and complete results in the store.
    #[serde(default = "default_cache_results")]
    pub cache_results: bool,

    /// Origins tried for a package, in order.
    #[serde(default = "default_source_code_origins")]
    pub source_code_origins: Vec<SourceCodeOrigin>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            timeout_secs: default_timeout_secs(),
            max_nested_depth: default_max_nested_depth(),
            cache_results: default_cache_results(),
            source_code_origins: default_source_code_origins(),
        }
    }
}

impl ResolverConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::invalid(
                "resolver.max_concurrency",
                "must be at least 1",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("resolver.timeout_secs", "must be at least 1"));
        }
        if self.source_code_origins.is_empty() {
            return Err(ConfigError::invalid(
                "resolver.source_code_origins",
                "at least one origin is required",
            ));
        }
        let distinct: BTreeSet<_> = self.source_code_origins.iter().map(|o| o.as_str()).collect();
        if distinct.len() != self.source_code_origins.len() {
            return Err(ConfigError::invalid(
                "resolver.source_code_origins",
                "origins must not repeat",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = ResolverConfig::default();
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.timeout(), Duration::from_secs(300));
        assert_eq!(config.max_nested_depth, 8);
        assert!(config.cache_results);
        assert_eq!(
            config.source_code_origins,
            vec![SourceCodeOrigin::Vcs, SourceCodeOrigin::Artifact]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn repeated_origins_are_rejected() {
        let config = ResolverConfig {
            source_code_origins: vec![SourceCodeOrigin::Vcs, SourceCodeOrigin::Vcs],
            ..ResolverConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "resolver.source_code_origins"
        ));
    }
}
