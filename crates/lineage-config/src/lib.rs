//! # lineage-config
//!
//! Layered configuration loading for Lineage using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`LINEAGE_*` prefix, `__` as separator)
//! 2. Project-level `.lineage/config.toml`
//! 3. User-level `~/.config/lineage/config.toml`
//! 4. Built-in defaults
//!
//! `LINEAGE_RESOLVER__MAX_CONCURRENCY` maps to `resolver.max_concurrency`,
//! `LINEAGE_STORAGE__ROOT` to `storage.root`, and so on.
//!
//! # Usage
//!
//! ```no_run
//! use lineage_config::LineageConfig;
//!
//! let config = LineageConfig::load_with_dotenv().expect("config");
//! println!("{} workers", config.resolver.max_concurrency);
//! ```

mod download;
mod error;
mod resolver;
mod storage;

pub use download::DownloadConfig;
pub use error::ConfigError;
pub use resolver::ResolverConfig;
pub use storage::StorageConfig;

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// Project-local configuration file, relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = ".lineage/config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LineageConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

impl LineageConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does not read `.env`; use [`Self::load_with_dotenv`] for that.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if a source cannot be parsed and
    /// [`ConfigError::InvalidValue`] if a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        Self::extract(Self::figment())
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        // A missing .env is not an error.
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Load configuration with `file` layered above the project-local file.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn load_from(file: &Path) -> Result<Self, ConfigError> {
        let figment = Self::base_figment()
            .merge(Toml::file(file))
            .merge(Self::env_provider());
        Self::extract(figment)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        Self::base_figment().merge(Self::env_provider())
    }

    fn base_figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(LOCAL_CONFIG_PATH);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment
    }

    fn env_provider() -> Env {
        Env::prefixed("LINEAGE_").split("__")
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolver.validate()?;
        if self.download.timeout_secs == 0 {
            return Err(ConfigError::invalid("download.timeout_secs", "must be at least 1"));
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lineage").join("config.toml"))
    }
}
