//! Single-page crawl: policy check, fetch, decode, parse, extract.
//!
//! ```text
//! CheckingPolicy -> Fetching -> DetectingCharset -> Parsing -> Extracting -> Done
//!        \              \              \               \            \
//!         +--------------+--------------+---------------+------------+--> Rejected
//! ```
//!
//! Every rejection is a [`Rejection`] with a stable `(status, title, detail)`.
//! Transport faults other than an oversized body are returned as
//! [`CrawlError::Transport`] and are never turned into rejections.

use std::fmt;
use std::sync::{Arc, LazyLock};

use metafetch_core::{AppConfig, CrawlResult, PageMetadata, PolicyCache};
use regex::Regex;
use reqwest::header;
use url::Url;

use crate::charset;
use crate::error::{CrawlError, Rejection, TransportError};
use crate::extract::{Document, extract_metadata};
use crate::fetch::{FetchRequest, Transport};
use crate::robots::RobotsResolver;

static HTML_CONTENT_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/(?:html|xhtml\+xml)\b").expect("invalid regex"));

const ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.1";

/// Where a crawl currently is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStage {
    CheckingPolicy,
    Fetching,
    DetectingCharset,
    Parsing,
    Extracting,
    Done,
}

impl fmt::Display for CrawlStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CheckingPolicy => "checking_policy",
            Self::Fetching => "fetching",
            Self::DetectingCharset => "detecting_charset",
            Self::Parsing => "parsing",
            Self::Extracting => "extracting",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

impl Rejection {
    /// The stage that raises this rejection.
    pub fn stage(&self) -> CrawlStage {
        match self {
            Self::RobotsDisallowed { .. } => CrawlStage::CheckingPolicy,
            Self::UpstreamStatus(_) | Self::NotHtml(_) | Self::TooLarge { .. } => CrawlStage::Fetching,
            Self::Unparsable | Self::MissingHead => CrawlStage::Parsing,
            Self::MissingTitle | Self::NoIndex => CrawlStage::Extracting,
        }
    }
}

/// Whether a Content-Type names an HTML document.
pub fn is_html(content_type: &str) -> bool {
    HTML_CONTENT_TYPE.is_match(content_type)
}

/// Runs one crawl per call. Cheap to clone; clones share the transport and
/// the policy cache.
#[derive(Clone)]
pub struct Crawler {
    transport: Arc<dyn Transport>,
    robots: RobotsResolver,
    respect_robots: bool,
}

impl Crawler {
    pub fn new(transport: Arc<dyn Transport>, policies: PolicyCache, config: &AppConfig) -> Self {
        let robots = RobotsResolver::new(Arc::clone(&transport), policies, config.user_agent.clone());
        Self { transport, robots, respect_robots: config.respect_robots }
    }

    /// Crawl `url` (already normalized) asking for `lang` content.
    pub async fn crawl(&self, url: &Url, lang: &str) -> Result<CrawlResult, CrawlError> {
        let result = self.run(url, lang).await;
        match &result {
            Ok(_) => tracing::debug!(url = %url, stage = %CrawlStage::Done, "crawl finished"),
            Err(CrawlError::Denied(rejection)) => {
                tracing::info!(url = %url, stage = %rejection.stage(), reason = %rejection, "crawl rejected")
            }
            Err(e) => tracing::warn!(url = %url, error = %e, "crawl failed"),
        }
        result
    }

    async fn run(&self, url: &Url, lang: &str) -> Result<CrawlResult, CrawlError> {
        if self.respect_robots && !self.robots.is_allowed(url).await? {
            return Err(Rejection::RobotsDisallowed { path: url.path().to_string() }.into());
        }

        let mut request = FetchRequest::get(url.clone())
            .header(header::USER_AGENT, self.robots.user_agent())
            .header(header::ACCEPT, ACCEPT);
        if !lang.is_empty() {
            request = request.header(header::ACCEPT_LANGUAGE, lang);
        }

        let response = match self.transport.fetch(request).await {
            Ok(response) => response,
            Err(TransportError::TooLarge { len, limit }) => return Err(Rejection::TooLarge { len, limit }.into()),
            Err(e) => return Err(e.into()),
        };

        if response.status.as_u16() >= 400 {
            return Err(Rejection::UpstreamStatus(response.status.as_u16()).into());
        }
        match response.content_type() {
            Some(content_type) if is_html(content_type) => {}
            other => return Err(Rejection::NotHtml(other.map(String::from)).into()),
        }

        let metadata = parse_page(&response.body, &response.final_url)?;
        Ok(CrawlResult { metadata, fetched_at: response.fetched_at })
    }
}

/// Decode, parse and extract without holding the (non-`Send`) tree across
/// an await point.
fn parse_page(body: &[u8], final_url: &Url) -> Result<PageMetadata, Rejection> {
    let (text, encoding) = charset::decode(body);
    tracing::trace!(stage = %CrawlStage::DetectingCharset, encoding = encoding.name(), "decoded body");

    let doc = Document::parse(&text);
    let root = doc.root().ok_or(Rejection::Unparsable)?;
    let head = doc.head().ok_or(Rejection::MissingHead)?;

    extract_metadata(root, head, final_url)
}
