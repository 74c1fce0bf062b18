//! Configuration validation rules.
//!
//! Checks `AppConfig` values after they have been loaded from environment,
//! files, or defaults.

use std::net::SocketAddr;

use crate::config::{AppConfig, CacheBackendKind};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_redirects` exceeds 20
    /// - `user_agent` is empty
    /// - any cache max-age is 0
    /// - `listen_addr` is not a socket address
    ///
    /// Returns `ConfigError::Missing` if the selected cache backend has no
    /// location configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_redirects > 20 {
            return Err(invalid("max_redirects", "must not exceed 20"));
        }

        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        for (field, secs) in [
            ("response_max_age_secs", self.response_max_age_secs),
            ("robots_max_age_secs", self.robots_max_age_secs),
            ("deny_max_age_secs", self.deny_max_age_secs),
        ] {
            if secs == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
        }

        match self.cache_backend {
            CacheBackendKind::Fs if self.cache_dir.as_os_str().is_empty() => {
                return Err(ConfigError::Missing {
                    field: "cache_dir".into(),
                    hint: "set METAFETCH_CACHE_DIR or switch METAFETCH_CACHE_BACKEND to sqlite".into(),
                });
            }
            CacheBackendKind::Sqlite if self.db_path.as_os_str().is_empty() => {
                return Err(ConfigError::Missing {
                    field: "db_path".into(),
                    hint: "set METAFETCH_DB_PATH or switch METAFETCH_CACHE_BACKEND to fs".into(),
                });
            }
            _ => {}
        }

        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(invalid("listen_addr", "must be a socket address such as 127.0.0.1:8080"));
        }

        if self.default_lang.trim().is_empty() {
            tracing::warn!("default_lang is empty; requests without a lang will send no Accept-Language");
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
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_max_bytes_exceeds_limit() {
        let config = AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_redirects() {
        let config = AppConfig { max_redirects: 21, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "max_redirects"));

        let config = AppConfig { max_redirects: 0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: "  ".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_zero_max_age() {
        let config = AppConfig { robots_max_age_secs: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "robots_max_age_secs"));
    }

    #[test]
    fn test_validate_missing_backend_location() {
        let config = AppConfig { cache_dir: PathBuf::new(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Missing { field, .. }) if field == "cache_dir"));

        let config = AppConfig { cache_backend: CacheBackendKind::Sqlite, db_path: PathBuf::new(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Missing { field, .. }) if field == "db_path"));

        // The unused location may be empty.
        let config = AppConfig { cache_backend: CacheBackendKind::Sqlite, cache_dir: PathBuf::new(), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_listen_addr() {
        let config = AppConfig { listen_addr: "localhost".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "listen_addr"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 50 * 1024 * 1024, timeout_ms: 300_000, max_redirects: 20, ..Default::default() };
        assert!(config.validate().is_ok());

        let config = AppConfig { max_bytes: 1, timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
