//! Structured errors for the metafetch server.
//!
//! Every error renders as an RFC 7807 problem document. Only crawl rejections
//! carry a [`DenyDecision`] and are worth caching.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use metafetch_client::CrawlError;
use metafetch_core::{DenyDecision, Problem};

pub const PROBLEM_JSON: &str = "application/problem+json";

/// Problem detail for faults; the cause is only logged.
pub const INTERNAL_DETAIL: &str = "Crawler failed to reach the requested page.";

/// Structured errors for the metafetch server.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("METHOD_NOT_ALLOWED: {0}")]
    MethodNotAllowed(String),

    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    #[error("INVALID_INPUT: missing url parameter")]
    MissingUrl,

    /// `url` does not start with an http(s) scheme.
    #[error("INVALID_INPUT: url must start with http:// or https://")]
    UnsupportedUrl,

    /// `url` starts like one but does not parse.
    #[error("INVALID_INPUT: {0}")]
    MalformedUrl(String),

    /// `url` points back at this server.
    #[error("INVALID_INPUT: url targets this server")]
    SelfReferential,

    /// A cacheable crawl rejection, fresh or replayed from the deny cache.
    #[error("DENIED: {}", .0.title)]
    Denied(DenyDecision),

    #[error("INTERNAL_ERROR: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MissingUrl | Self::UnsupportedUrl | Self::MalformedUrl(_) | Self::SelfReferential => {
                StatusCode::BAD_REQUEST
            }
            Self::Denied(deny) => StatusCode::from_u16(deny.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn problem(&self) -> Problem {
        match self {
            Self::MethodNotAllowed(method) => {
                Problem::new(format!("Method '{method}' is not allowed."), "you can use GET or HEAD method only.")
            }
            Self::NotFound(_) => Problem::new("There are no content.", "Haven't you made a mistake?"),
            Self::MissingUrl => Problem::new("Missing 'url' parameter.", "you must set 'url' parameter."),
            Self::UnsupportedUrl => Problem::new(
                "Incorrect 'url' parameter.",
                "'url' parameter must start with 'http://' or 'https://'.",
            ),
            Self::MalformedUrl(reason) => Problem::new("Incorrect 'url' parameter.", reason.clone()),
            Self::SelfReferential => Problem::new(
                "Incorrect 'url' parameter.",
                "'url' parameter contains hostname that is same as server hostname.",
            ),
            Self::Denied(deny) => Problem::from(deny),
            Self::Internal(_) => Problem::new("Internal server error.", INTERNAL_DETAIL),
        }
    }

    /// The decision to store in the deny cache, for rejections only.
    pub fn deny_decision(&self) -> Option<&DenyDecision> {
        match self {
            Self::Denied(deny) => Some(deny),
            _ => None,
        }
    }
}

impl From<CrawlError> for ApiError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::InvalidUrl(e) => Self::MalformedUrl(e.to_string()),
            CrawlError::Denied(rejection) => Self::Denied(DenyDecision::from(&rejection)),
            CrawlError::Transport(e) => {
                tracing::error!(error = %e, "crawl failed");
                Self::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), [(header::CONTENT_TYPE, PROBLEM_JSON)], Json(self.problem())).into_response()
    }
}
