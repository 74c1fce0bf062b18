//! Persistent caches for crawl results, robots policies and rejections.
//!
//! One generic [`Store`] is instantiated three times:
//!
//! - [`ResponseCache`]: successful crawls, keyed by (URL, language), 24h
//! - [`PolicyCache`]: robots.txt decisions, keyed by robots.txt URL, 12h
//! - [`DenyCache`]: cacheable rejections, keyed by `METHOD REQUEST_URI`, 1h
//!
//! Entries are whole-document JSON overwrites carrying a schema version and a
//! storage timestamp. Concurrent writers to the same key are last-write-wins.
//! Storage is pluggable: a directory tree ([`FsBackend`]) or a single SQLite
//! table ([`SqliteBackend`]).

pub mod backend;
pub mod connection;
pub mod hash;
pub mod migrations;
pub mod store;
pub mod stores;

pub use crate::Error;

pub use backend::{FsBackend, StorageBackend};
pub use connection::SqliteBackend;
pub use hash::{CacheKey, compute_cache_key};
pub use store::{CURRENT_VERSION, CacheEntry, Cached, Store};
pub use stores::{Caches, DENY_MAX_AGE, DenyCache, POLICY_MAX_AGE, PolicyCache, RESPONSE_MAX_AGE, ResponseCache};
