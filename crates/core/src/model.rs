//! Records passed between the crawler, the caches and the HTTP front.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

/// Matches every path; used by synthetic robots decisions.
static ANY_PATH: LazyLock<Pattern> = LazyLock::new(|| Pattern::new("^/").expect("invalid pattern"));

/// Matches every user agent.
static ANY_AGENT: LazyLock<Pattern> = LazyLock::new(|| Pattern::new("^").expect("invalid pattern"));

/// Canonical metadata for a page.
///
/// `title` and `canonical` are always present; every other field is only set
/// when the page provided a source for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub canonical: Url,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Url>,
}

/// A successful crawl, as stored in the response cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub metadata: PageMetadata,
    /// When the page request was issued.
    pub fetched_at: DateTime<Utc>,
}

/// A rejection that may be replayed from the negative-result cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenyDecision {
    pub status: u16,
    pub title: String,
    pub detail: String,
}

impl DenyDecision {
    pub fn new(status: u16, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { status, title: title.into(), detail: detail.into() }
    }
}

/// RFC 7807 problem document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub detail: String,
}

impl Problem {
    pub fn new(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { kind: "about:blank".into(), title: title.into(), detail: detail.into() }
    }
}

impl From<&DenyDecision> for Problem {
    fn from(deny: &DenyDecision) -> Self {
        Problem::new(deny.title.clone(), deny.detail.clone())
    }
}

/// A compiled regular expression that round-trips through its source text.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.0.is_match(haystack)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(serde::de::Error::custom)
    }
}

/// The allow/disallow rules that apply to one user agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotsDecision {
    pub user_agent: Pattern,
    pub allow: Option<Pattern>,
    pub disallow: Option<Pattern>,
    /// Set when the decision was fabricated by a fallback rule instead of
    /// parsed from a robots.txt body.
    #[serde(default)]
    pub is_synthetic: bool,
}

impl RobotsDecision {
    /// Synthetic decision permitting every path.
    pub fn full_allow() -> Self {
        Self { user_agent: ANY_AGENT.clone(), allow: Some(ANY_PATH.clone()), disallow: None, is_synthetic: true }
    }

    /// Synthetic decision forbidding every path.
    pub fn full_disallow() -> Self {
        Self { user_agent: ANY_AGENT.clone(), allow: None, disallow: Some(ANY_PATH.clone()), is_synthetic: true }
    }

    /// A path is denied only when it matches `disallow` and not `allow`.
    pub fn is_allowed(&self, path: &str) -> bool {
        let allowed = self.allow.as_ref().is_some_and(|p| p.is_match(path));
        let disallowed = self.disallow.as_ref().is_some_and(|p| p.is_match(path));
        !disallowed || allowed
    }

    /// Evaluate against a URL's path and query string.
    pub fn is_allowed_url(&self, url: &Url) -> bool {
        match url.query() {
            Some(query) => self.is_allowed(&format!("{}?{}", url.path(), query)),
            None => self.is_allowed(url.path()),
        }
    }
}
