//! Crawl pipeline for metafetch.
//!
//! This crate provides the HTTP transport, robots.txt compliance, charset
//! detection, metadata extraction and the cached lookup service shared by the
//! server and CLI.

pub mod charset;
pub mod crawl;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod robots;
pub mod service;

pub use crawl::{CrawlStage, Crawler};
pub use error::{CrawlError, Rejection, TransportError, UrlError};
pub use extract::{Document, extract, extract_metadata};
pub use fetch::{FetchConfig, FetchRequest, FetchResponse, HttpTransport, Transport, normalize};
pub use robots::RobotsResolver;
pub use service::{CacheStatus, Lookup, MetadataService};
