//! Core types and shared functionality for metafetch.
//!
//! This crate provides:
//! - The page metadata data model shared by the crawler and the HTTP front
//! - A generic TTL + schema-versioned cache with filesystem and SQLite backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod model;

pub use cache::{Cached, Caches, DenyCache, PolicyCache, ResponseCache, Store};
pub use config::{AppConfig, CacheBackendKind, ConfigError};
pub use error::Error;
pub use model::{CrawlResult, DenyDecision, PageMetadata, Pattern, Problem, RobotsDecision};
