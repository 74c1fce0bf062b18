//! URL normalization for consistent caching.

use url::Url;

/// Error type for URL normalization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("INVALID_URL: empty URL")]
    Empty,

    #[error("INVALID_URL: unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),
}

/// Normalize a URL string into the form used as a cache key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an explicit `http` or `https` scheme and a host
/// 3. Default an absent path to `/`
/// 4. Remove fragment (#...)
/// 5. Keep scheme, authority and query string intact (do not reorder)
///
/// Host lowercasing and default-port elision come from WHATWG parsing.
pub fn normalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::InvalidUrl(format!("missing host: {trimmed}")));
    }

    if parsed.path().is_empty() {
        parsed.set_path("/");
    }
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Location of the robots.txt governing `url`: same origin, path `/robots.txt`.
pub fn robots_url(url: &Url) -> Url {
    let mut robots = url.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    robots
}
