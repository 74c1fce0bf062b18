//! Generic TTL + schema-versioned cache over a [`StorageBackend`].

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::backend::StorageBackend;
use super::hash::CacheKey;

/// Entry layout version. Entries written under any other version are ignored.
pub const CURRENT_VERSION: u32 = 1;

/// Stored form of a cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub stored_at: DateTime<Utc>,
    /// Override in seconds; `None` defers to the store's default.
    pub max_age: Option<u64>,
    pub schema_version: u32,
}

impl<T> CacheEntry<T> {
    /// Usable iff `now - stored_at <= max_age`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, default_max_age: Duration) -> bool {
        let max_age = self.max_age.map(Duration::from_secs).unwrap_or(default_max_age);
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(self.stored_at) <= max_age
    }
}

#[derive(Deserialize)]
struct VersionHeader {
    schema_version: Option<u32>,
}

/// A payload read back from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub payload: T,
    pub stored_at: DateTime<Utc>,
    pub fresh: bool,
}

/// Typed cache store.
///
/// Lookups never fail: missing, unreadable, malformed or version-mismatched
/// entries read as absent, and backend faults are logged and treated the same.
/// Saves report success as a flag instead of an error.
pub struct Store<T> {
    backend: Arc<dyn StorageBackend>,
    default_max_age: Duration,
    version: u32,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            default_max_age: self.default_max_age,
            version: self.version,
            _payload: PhantomData,
        }
    }
}

impl<T> Store<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(backend: Arc<dyn StorageBackend>, default_max_age: Duration) -> Self {
        Self { backend, default_max_age, version: CURRENT_VERSION, _payload: PhantomData }
    }

    /// Read and write entries under a different schema version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Look up an entry, returning stale entries flagged with `fresh = false`.
    pub async fn lookup(&self, key: &CacheKey) -> Option<Cached<T>> {
        self.lookup_at(key, Utc::now()).await
    }

    /// [`Store::lookup`] evaluated at an explicit instant.
    pub async fn lookup_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Cached<T>> {
        let bytes = match self.backend.read(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_slice::<VersionHeader>(&bytes) {
            Ok(VersionHeader { schema_version: Some(v) }) if v == self.version => {}
            Ok(header) => {
                tracing::debug!(key = %key, found = ?header.schema_version, expected = self.version, "cache entry version mismatch");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "unreadable cache entry");
                return None;
            }
        }

        let entry: CacheEntry<T> = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "malformed cache entry");
                return None;
            }
        };

        let fresh = entry.is_fresh_at(now, self.default_max_age);
        Some(Cached { payload: entry.payload, stored_at: entry.stored_at, fresh })
    }

    /// Fresh entries only.
    pub async fn find(&self, key: &CacheKey) -> Option<T> {
        self.find_at(key, Utc::now()).await
    }

    pub async fn find_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<T> {
        self.lookup_at(key, now)
            .await
            .filter(|cached| cached.fresh)
            .map(|cached| cached.payload)
    }

    /// Overwrite the entry for `key`. `max_age` replaces the store default for
    /// this entry only.
    pub async fn save(&self, key: &CacheKey, payload: &T, max_age: Option<Duration>) -> bool {
        let entry = CacheEntry {
            payload,
            stored_at: Utc::now(),
            max_age: max_age.map(|d| d.as_secs()),
            schema_version: self.version,
        };

        let bytes = match serde_json::to_vec_pretty(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to encode cache entry");
                return false;
            }
        };

        match self.backend.write(key, bytes).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache write failed");
                false
            }
        }
    }
}
