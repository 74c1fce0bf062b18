//! Error taxonomy for the crawl pipeline.
//!
//! Three channels, kept apart so callers can decide what to cache:
//!
//! - [`UrlError`]: the input could not be used. Never cached.
//! - [`Rejection`]: the crawl ran and the page may not or cannot be indexed.
//!   Each carries a stable `(status, title, detail)` triple and may be stored
//!   in the negative-result cache.
//! - [`TransportError`]: the network failed. Never cached.

use metafetch_core::DenyDecision;

pub use crate::fetch::url::UrlError;

/// Status reported for every rejection.
pub const REJECTION_STATUS: u16 = 500;

/// Transport-level failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("FETCH_TIMEOUT: {0}")]
    Timeout(String),

    #[error("HTTP_ERROR: {0}")]
    Network(String),

    #[error("FETCH_TOO_LARGE: {len} bytes exceeds {limit}")]
    TooLarge { len: u64, limit: usize },

    #[error("HTTP_ERROR: failed to build HTTP client: {0}")]
    Build(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Conditions under which a page is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("ROBOTS_DISALLOWED: {path}")]
    RobotsDisallowed { path: String },

    #[error("UPSTREAM_STATUS: {0}")]
    UpstreamStatus(u16),

    #[error("NOT_HTML: {}", .0.as_deref().unwrap_or("no content type"))]
    NotHtml(Option<String>),

    #[error("FETCH_TOO_LARGE: {len} bytes exceeds {limit}")]
    TooLarge { len: u64, limit: usize },

    #[error("PARSE_FAILED: empty document")]
    Unparsable,

    #[error("PARSE_FAILED: missing head element")]
    MissingHead,

    #[error("EXTRACT_FAILED: missing title")]
    MissingTitle,

    #[error("NOINDEX: meta robots forbids indexing")]
    NoIndex,
}

impl Rejection {
    pub fn status(&self) -> u16 {
        REJECTION_STATUS
    }

    /// Short, stable summary shown as the problem document title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::RobotsDisallowed { .. } => "Indexing not permitted by 'robots.txt'.",
            Self::UpstreamStatus(_) => "Response status code greater than 400.",
            Self::NotHtml(_) => "Content isn't HTML.",
            Self::TooLarge { .. } => "Response too large.",
            Self::Unparsable => "Can't parse the response.",
            Self::MissingHead => "Missing head tag in the response.",
            Self::MissingTitle => "Missing title in the response.",
            Self::NoIndex => "Indexing not permitted by meta 'robots' tag.",
        }
    }

    pub fn detail(&self) -> String {
        match self {
            Self::RobotsDisallowed { .. } => {
                "Crawler can't continue indexing because 'robots.txt' has a 'disallow' entry.".into()
            }
            Self::UpstreamStatus(code) => format!("HTTP Error Code {code} happened at connected server."),
            Self::NotHtml(_) => "Crawler can't get information from this url.".into(),
            Self::TooLarge { len, limit } => format!("Response body of {len} bytes exceeds the {limit} byte limit."),
            Self::Unparsable => "Crawler can't parse the response from url.".into(),
            Self::MissingHead => "Crawler can't find head tag in the response from url.".into(),
            Self::MissingTitle => "Crawler can't find title in the response from url.".into(),
            Self::NoIndex => "Crawler can't continue indexing because meta 'robots' tag includes 'noindex' \
                              in the response from url."
                .into(),
        }
    }
}

impl From<&Rejection> for DenyDecision {
    fn from(rejection: &Rejection) -> Self {
        DenyDecision::new(rejection.status(), rejection.title(), rejection.detail())
    }
}

/// Everything a crawl can fail with.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CrawlError {
    #[error(transparent)]
    InvalidUrl(#[from] UrlError),

    #[error(transparent)]
    Denied(#[from] Rejection),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl CrawlError {
    /// The cacheable form of this error, if it has one.
    pub fn deny_decision(&self) -> Option<DenyDecision> {
        match self {
            Self::Denied(rejection) => Some(rejection.into()),
            Self::InvalidUrl(_) | Self::Transport(_) => None,
        }
    }
}
