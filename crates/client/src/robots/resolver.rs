//! robots.txt policy resolution backed by the policy cache.
//!
//! Status handling follows common crawler practice:
//!
//! | robots.txt outcome | decision | cached for |
//! |---|---|---|
//! | 4xx | full allow (synthetic) | cache default |
//! | 5xx | full disallow (synthetic) | 10 minutes |
//! | timeout | full allow (synthetic) | 5 minutes |
//! | other transport error | propagated | not cached |
//! | anything else | parsed, full allow if no block matches | cache default |

use std::sync::Arc;
use std::time::Duration;

use metafetch_core::{PolicyCache, RobotsDecision};
use reqwest::header;
use url::Url;

use super::parser;
use crate::fetch::{FetchRequest, Transport, TransportError, robots_url};

/// Lifetime of a full-disallow decision synthesized from a 5xx.
pub const SERVER_ERROR_MAX_AGE: Duration = Duration::from_secs(10 * 60);

/// Lifetime of a full-allow decision synthesized from a timeout.
pub const TIMEOUT_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Only this much of a robots.txt body is parsed.
const MAX_ROBOTS_SIZE: usize = 1024 * 1024;

/// Answers "may this agent crawl this URL?" with one robots.txt fetch per
/// origin per cache lifetime.
#[derive(Clone)]
pub struct RobotsResolver {
    transport: Arc<dyn Transport>,
    cache: PolicyCache,
    user_agent: String,
}

impl RobotsResolver {
    pub fn new(transport: Arc<dyn Transport>, cache: PolicyCache, user_agent: impl Into<String>) -> Self {
        Self { transport, cache, user_agent: user_agent.into() }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Decision governing `url`, from cache or a fresh robots.txt fetch.
    ///
    /// # Errors
    ///
    /// Transport failures other than timeouts are returned as-is and
    /// nothing is cached.
    pub async fn resolve(&self, url: &Url) -> Result<RobotsDecision, TransportError> {
        let robots_url = robots_url(url);
        let key = robots_url.as_str();

        if let Some(decision) = self.cache.find(key).await {
            tracing::debug!(robots_url = key, "robots.txt cache hit");
            return Ok(decision);
        }

        let (decision, max_age) = self.fetch_decision(&robots_url).await?;
        if !self.cache.save(key, &decision, max_age).await {
            tracing::warn!(robots_url = key, "failed to cache robots.txt decision");
        }

        Ok(decision)
    }

    /// Whether `url` may be crawled.
    pub async fn is_allowed(&self, url: &Url) -> Result<bool, TransportError> {
        Ok(self.resolve(url).await?.is_allowed_url(url))
    }

    async fn fetch_decision(&self, robots_url: &Url) -> Result<(RobotsDecision, Option<Duration>), TransportError> {
        let request = FetchRequest::get(robots_url.clone()).header(header::USER_AGENT, &self.user_agent);

        let response = match self.transport.fetch(request).await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                tracing::warn!(robots_url = %robots_url, error = %e, "robots.txt timed out, allowing for now");
                return Ok((RobotsDecision::full_allow(), Some(TIMEOUT_MAX_AGE)));
            }
            Err(e) => return Err(e),
        };

        let status = response.status;
        if status.is_client_error() {
            tracing::debug!(robots_url = %robots_url, status = status.as_u16(), "no robots.txt, allowing all");
            return Ok((RobotsDecision::full_allow(), None));
        }
        if status.is_server_error() {
            tracing::warn!(robots_url = %robots_url, status = status.as_u16(), "robots.txt server error, blocking for now");
            return Ok((RobotsDecision::full_disallow(), Some(SERVER_ERROR_MAX_AGE)));
        }

        let body = &response.body[..response.body.len().min(MAX_ROBOTS_SIZE)];
        let text = String::from_utf8_lossy(body);

        let decision = match parser::parse(&text, Some(&self.user_agent)) {
            Ok(candidates) => select(candidates).unwrap_or_else(RobotsDecision::full_allow),
            Err(e) => {
                tracing::warn!(robots_url = %robots_url, error = %e, "unusable robots.txt, allowing all");
                RobotsDecision::full_allow()
            }
        };

        Ok((decision, None))
    }
}

/// Prefer a block naming this agent over a wildcard block.
fn select(mut candidates: Vec<RobotsDecision>) -> Option<RobotsDecision> {
    let specific = candidates.iter().position(|d| !d.user_agent.is_match(UNNAMED_AGENT));
    match specific {
        Some(index) => Some(candidates.swap_remove(index)),
        None => candidates.into_iter().next(),
    }
}

/// An agent string no named block would match.
const UNNAMED_AGENT: &str = "\u{0}";
