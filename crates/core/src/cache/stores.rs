//! The three concrete caches: responses, robots policies and denials.
//!
//! Each is a [`Store`] with its own key function, payload and default max-age.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::backend::{FsBackend, StorageBackend};
use super::connection::SqliteBackend;
use super::hash::CacheKey;
use super::store::{Cached, Store};
use crate::config::{AppConfig, CacheBackendKind};
use crate::model::{CrawlResult, DenyDecision, RobotsDecision};
use crate::Error;

/// Default freshness of a crawled page (24 hours).
pub const RESPONSE_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Default freshness of a robots.txt decision (12 hours).
pub const POLICY_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// Default freshness of a cached rejection (1 hour).
pub const DENY_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Successful crawls keyed by (normalized URL, language).
#[derive(Clone)]
pub struct ResponseCache {
    store: Store<CrawlResult>,
}

impl ResponseCache {
    pub fn new(backend: Arc<dyn StorageBackend>, max_age: Duration) -> Self {
        Self { store: Store::new(backend, max_age) }
    }

    pub fn key(url: &str, lang: &str) -> CacheKey {
        CacheKey::with_variant("responses", url, lang)
    }

    /// Stale entries are returned with `fresh = false`.
    pub async fn lookup(&self, url: &str, lang: &str) -> Option<Cached<CrawlResult>> {
        self.store.lookup(&Self::key(url, lang)).await
    }

    pub async fn save(&self, url: &str, lang: &str, result: &CrawlResult) -> bool {
        self.store.save(&Self::key(url, lang), result, None).await
    }
}

/// Robots decisions keyed by robots.txt URL.
#[derive(Clone)]
pub struct PolicyCache {
    store: Store<RobotsDecision>,
}

impl PolicyCache {
    pub fn new(backend: Arc<dyn StorageBackend>, max_age: Duration) -> Self {
        Self { store: Store::new(backend, max_age) }
    }

    pub fn key(robots_url: &str) -> CacheKey {
        CacheKey::new("robots", robots_url)
    }

    pub async fn find(&self, robots_url: &str) -> Option<RobotsDecision> {
        self.store.find(&Self::key(robots_url)).await
    }

    pub async fn save(&self, robots_url: &str, decision: &RobotsDecision, max_age: Option<Duration>) -> bool {
        self.store.save(&Self::key(robots_url), decision, max_age).await
    }

    /// [`PolicyCache::find`] evaluated at an explicit instant.
    pub async fn find_at(&self, robots_url: &str, now: DateTime<Utc>) -> Option<RobotsDecision> {
        self.store.find_at(&Self::key(robots_url), now).await
    }
}

/// Rejections keyed by `METHOD REQUEST_URI`.
#[derive(Clone)]
pub struct DenyCache {
    store: Store<DenyDecision>,
}

impl DenyCache {
    pub fn new(backend: Arc<dyn StorageBackend>, max_age: Duration) -> Self {
        Self { store: Store::new(backend, max_age) }
    }

    pub fn key(method: &str, request_uri: &str) -> CacheKey {
        CacheKey::new("deny", &format!("{method} {request_uri}"))
    }

    pub async fn find(&self, method: &str, request_uri: &str) -> Option<DenyDecision> {
        self.store.find(&Self::key(method, request_uri)).await
    }

    pub async fn save(&self, method: &str, request_uri: &str, decision: &DenyDecision) -> bool {
        self.store.save(&Self::key(method, request_uri), decision, None).await
    }
}

/// All three caches over one shared backend.
#[derive(Clone)]
pub struct Caches {
    pub responses: ResponseCache,
    pub policies: PolicyCache,
    pub denials: DenyCache,
}

impl Caches {
    /// Open the backend selected by `config.cache_backend`.
    pub async fn open(config: &AppConfig) -> Result<Self, Error> {
        let backend: Arc<dyn StorageBackend> = match config.cache_backend {
            CacheBackendKind::Fs => Arc::new(FsBackend::new(&config.cache_dir)),
            CacheBackendKind::Sqlite => Arc::new(SqliteBackend::open(&config.db_path).await?),
        };
        tracing::debug!(backend = ?config.cache_backend, "opened cache storage");
        Ok(Self::with_backend(backend, config))
    }

    pub fn with_backend(backend: Arc<dyn StorageBackend>, config: &AppConfig) -> Self {
        Self {
            responses: ResponseCache::new(Arc::clone(&backend), config.response_max_age()),
            policies: PolicyCache::new(Arc::clone(&backend), config.robots_max_age()),
            denials: DenyCache::new(backend, config.deny_max_age()),
        }
    }
}
