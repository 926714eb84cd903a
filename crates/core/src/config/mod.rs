//! Store configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SQLSTORE_*)
//! 2. TOML config file (if SQLSTORE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Store configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SQLSTORE_*)
/// 2. TOML config file (if SQLSTORE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database.
    ///
    /// Set via SQLSTORE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// How long SQLite waits on a locked database, in milliseconds.
    ///
    /// Set via SQLSTORE_BUSY_TIMEOUT_MS environment variable.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Default deadline for a single call, in milliseconds.
    ///
    /// Set via SQLSTORE_QUERY_TIMEOUT_MS environment variable.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Compiled statements the SQLite connection keeps alive.
    ///
    /// Set via SQLSTORE_STATEMENT_CACHE_CAPACITY environment variable.
    #[serde(default = "default_statement_cache_capacity")]
    pub statement_cache_capacity: usize,

    /// Tasks a bounded group runs at once.
    ///
    /// Set via SQLSTORE_MAX_CONCURRENCY environment variable.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sqlstore.sqlite")
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_query_timeout_ms() -> u64 {
    30_000
}

fn default_statement_cache_capacity() -> usize {
    256
}

fn default_max_concurrency() -> usize {
    8
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            statement_cache_capacity: default_statement_cache_capacity(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SQLSTORE_`
    /// 2. TOML file from `SQLSTORE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SQLSTORE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SQLSTORE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into()),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
