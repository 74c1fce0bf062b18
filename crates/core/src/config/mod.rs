//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (METAFETCH_*)
//! 2. TOML config file (if METAFETCH_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::{DENY_MAX_AGE, POLICY_MAX_AGE, RESPONSE_MAX_AGE};

mod validation;

pub use validation::ConfigError;

/// Where cache entries are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// One JSON file per entry under `cache_dir`.
    #[default]
    Fs,
    /// One row per entry in the SQLite database at `db_path`.
    Sqlite,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (METAFETCH_*)
/// 2. TOML config file (if METAFETCH_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// User-Agent string for page and robots.txt requests.
    ///
    /// Set via METAFETCH_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via METAFETCH_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via METAFETCH_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Whether to respect robots.txt rules.
    ///
    /// Set via METAFETCH_RESPECT_ROBOTS environment variable.
    #[serde(default = "default_true")]
    pub respect_robots: bool,

    /// Storage used by all three caches.
    ///
    /// Set via METAFETCH_CACHE_BACKEND (`fs` or `sqlite`).
    #[serde(default)]
    pub cache_backend: CacheBackendKind,

    /// Root directory of the filesystem cache.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Path to the SQLite cache database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_response_max_age_secs")]
    pub response_max_age_secs: u64,

    #[serde(default = "default_robots_max_age_secs")]
    pub robots_max_age_secs: u64,

    #[serde(default = "default_deny_max_age_secs")]
    pub deny_max_age_secs: u64,

    /// Socket address the HTTP front binds to.
    ///
    /// Set via METAFETCH_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Language sent as `Accept-Language` when the request names none.
    #[serde(default = "default_lang")]
    pub default_lang: String,
}

fn default_user_agent() -> String {
    "metafetch/0.1 (+https://github.com/metafetch/metafetch)".into()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./metafetch-cache")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./metafetch-cache.sqlite")
}

fn default_response_max_age_secs() -> u64 {
    RESPONSE_MAX_AGE.as_secs()
}

fn default_robots_max_age_secs() -> u64 {
    POLICY_MAX_AGE.as_secs()
}

fn default_deny_max_age_secs() -> u64 {
    DENY_MAX_AGE.as_secs()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_lang() -> String {
    "en".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            max_bytes: default_max_bytes(),
            respect_robots: true,
            cache_backend: CacheBackendKind::default(),
            cache_dir: default_cache_dir(),
            db_path: default_db_path(),
            response_max_age_secs: default_response_max_age_secs(),
            robots_max_age_secs: default_robots_max_age_secs(),
            deny_max_age_secs: default_deny_max_age_secs(),
            listen_addr: default_listen_addr(),
            default_lang: default_lang(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn response_max_age(&self) -> Duration {
        Duration::from_secs(self.response_max_age_secs)
    }

    pub fn robots_max_age(&self) -> Duration {
        Duration::from_secs(self.robots_max_age_secs)
    }

    pub fn deny_max_age(&self) -> Duration {
        Duration::from_secs(self.deny_max_age_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `METAFETCH_`
    /// 2. TOML file from `METAFETCH_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("METAFETCH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("METAFETCH_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.user_agent, "metafetch/0.1 (+https://github.com/metafetch/metafetch)");
        assert_eq!(config.timeout_ms, 5_000);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.max_bytes, 5_242_880);
        assert!(config.respect_robots);
        assert_eq!(config.cache_backend, CacheBackendKind::Fs);
        assert_eq!(config.cache_dir, PathBuf::from("./metafetch-cache"));
        assert_eq!(config.default_lang, "en");
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.response_max_age(), Duration::from_secs(86_400));
        assert_eq!(config.robots_max_age(), Duration::from_secs(43_200));
        assert_eq!(config.deny_max_age(), Duration::from_secs(3_600));
    }

    #[test]
    fn test_backend_kind_parses_lowercase() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string("cache_backend = \"sqlite\"\ntimeout_ms = 2500"));
        let config: AppConfig = figment.extract().unwrap();
        assert_eq!(config.cache_backend, CacheBackendKind::Sqlite);
        assert_eq!(config.timeout_ms, 2500);
    }
}
