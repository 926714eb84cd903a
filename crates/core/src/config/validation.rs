//! Configuration validation rules.
//!
//! This module provides validation logic for `StoreConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::StoreConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl StoreConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `db_path` is empty
    /// - `busy_timeout_ms` exceeds 1 minute
    /// - `query_timeout_ms` is 0 or exceeds 10 minutes
    /// - `statement_cache_capacity` is 0 or exceeds 10000
    /// - `max_concurrency` is 0 or exceeds 1024
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid { field: "db_path".into(), reason: "must not be empty".into() });
        }

        if self.busy_timeout_ms > 60_000 {
            return Err(ConfigError::Invalid {
                field: "busy_timeout_ms".into(),
                reason: "must not exceed 1 minute (60000ms)".into(),
            });
        }

        if self.query_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "query_timeout_ms".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.query_timeout_ms > 600_000 {
            return Err(ConfigError::Invalid {
                field: "query_timeout_ms".into(),
                reason: "must not exceed 10 minutes (600000ms)".into(),
            });
        }

        if self.statement_cache_capacity == 0 || self.statement_cache_capacity > 10_000 {
            return Err(ConfigError::Invalid {
                field: "statement_cache_capacity".into(),
                reason: "must be between 1 and 10000".into(),
            });
        }

        if self.max_concurrency == 0 || self.max_concurrency > 1024 {
            return Err(ConfigError::Invalid {
                field: "max_concurrency".into(),
                reason: "must be between 1 and 1024".into(),
            });
        }

        if self.busy_timeout_ms > self.query_timeout_ms {
            tracing::warn!(
                busy_timeout_ms = self.busy_timeout_ms,
                query_timeout_ms = self.query_timeout_ms,
                "busy_timeout_ms exceeds query_timeout_ms; \
                 calls will time out before SQLite stops waiting on locks"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        let config = StoreConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_db_path() {
        let config = StoreConfig { db_path: PathBuf::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "db_path"));
    }

    #[test]
    fn test_validate_busy_timeout_exceeds_limit() {
        let config = StoreConfig { busy_timeout_ms: 60_001, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "busy_timeout_ms"));
    }

    #[test]
    fn test_validate_query_timeout_zero() {
        let config = StoreConfig { query_timeout_ms: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "query_timeout_ms"));
    }

    #[test]
    fn test_validate_statement_cache_capacity_bounds() {
        for capacity in [0, 10_001] {
            let config = StoreConfig { statement_cache_capacity: capacity, ..Default::default() };
            let result = config.validate();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "statement_cache_capacity"));
        }
    }

    #[test]
    fn test_validate_max_concurrency_zero() {
        let config = StoreConfig { max_concurrency: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_concurrency"));
    }

    #[test]
    fn test_validate_max_values() {
        let config = StoreConfig {
            busy_timeout_ms: 60_000,
            query_timeout_ms: 600_000,
            statement_cache_capacity: 10_000,
            max_concurrency: 1024,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
