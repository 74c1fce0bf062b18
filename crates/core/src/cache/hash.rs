//! Content-derived cache key generation.
//!
//! A key only locates an entry in storage; it is never compared against the
//! stored payload.

use sha2::{Digest, Sha256};
use std::fmt;

/// Compute a hex SHA-256 digest of a semantically meaningful input string.
pub fn compute_cache_key(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Relative storage location of a cache entry, `/`-separated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(pub(crate) String);

impl CacheKey {
    /// `<namespace>/<digest>.json`
    pub fn new(namespace: &str, input: &str) -> Self {
        Self(format!("{namespace}/{}.json", compute_cache_key(input)))
    }

    /// `<namespace>/<digest>/<variant>.json`, grouping variants of one input
    /// (e.g. languages of one URL) under a shared directory.
    pub fn with_variant(namespace: &str, input: &str, variant: &str) -> Self {
        Self(format!(
            "{namespace}/{}/{}.json",
            compute_cache_key(input),
            sanitize_segment(variant)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reduce a caller-supplied string to a safe single path segment.
fn sanitize_segment(raw: &str) -> String {
    let mut sanitized: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();

    while sanitized.contains("..") {
        sanitized = sanitized.replace("..", "_");
    }

    if sanitized.is_empty() { "_".to_string() } else { sanitized }
}
