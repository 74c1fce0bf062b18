//! The metadata endpoint.
//!
//! A single fallback handler answers every request: `GET /?url=...&lang=...`
//! returns page metadata as JSON, everything else is a problem document.
//! Rejections raised by a crawl are remembered per `METHOD REQUEST_URI` and
//! replayed from the deny cache until they expire.

use std::str::FromStr;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::uri::Authority;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, TimeDelta, Utc};
use metafetch_client::{CacheStatus, Lookup, MetadataService};
use metafetch_core::DenyCache;

use crate::error::ApiError;

/// Browser cache lifetime for successful answers.
pub const BROWSER_MAX_AGE_SECS: i64 = 24 * 60 * 60;

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
const X_DENY_CACHE: HeaderName = HeaderName::from_static("x-deny-cache");

#[derive(Clone)]
pub struct AppState {
    pub service: MetadataService,
    pub denials: DenyCache,
}

impl AppState {
    pub fn new(service: MetadataService, denials: DenyCache) -> Self {
        Self { service, denials }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new().fallback(metadata).with_state(state)
}

async fn metadata(State(state): State<AppState>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let request_uri = uri.path_and_query().map_or("/", |pq| pq.as_str());

    let mut response = match state.denials.find(method.as_str(), request_uri).await {
        Some(deny) => {
            tracing::debug!(%method, request_uri, "deny cache hit");
            with_deny_status(ApiError::Denied(deny).into_response(), "HIT")
        }
        None => match respond(&state, &method, &uri, &headers).await {
            Ok(response) => response,
            Err(err) => match err.deny_decision() {
                Some(deny) => {
                    if !state.denials.save(method.as_str(), request_uri, deny).await {
                        tracing::warn!(%method, request_uri, "failed to cache rejection");
                    }
                    with_deny_status(err.into_response(), "MISS")
                }
                None => err.into_response(),
            },
        },
    };

    response.headers_mut().insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

fn with_deny_status(mut response: Response, status: &'static str) -> Response {
    response.headers_mut().insert(X_DENY_CACHE, HeaderValue::from_static(status));
    response
}

async fn respond(state: &AppState, method: &Method, uri: &Uri, headers: &HeaderMap) -> Result<Response, ApiError> {
    if method == Method::OPTIONS {
        return Ok(preflight());
    }
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::MethodNotAllowed(method.to_string()));
    }
    if uri.path() != "/" {
        return Err(ApiError::NotFound(uri.path().to_string()));
    }

    let params = Params::parse(uri.query());
    let target = params.url.ok_or(ApiError::MissingUrl)?;
    if !has_http_scheme(&target) {
        return Err(ApiError::UnsupportedUrl);
    }
    if targets_self(&target, headers) {
        return Err(ApiError::SelfReferential);
    }

    let lookup = state.service.get(&target, params.lang.as_deref()).await?;
    if lookup.cache == CacheStatus::Hit && not_modified(headers, lookup.result.fetched_at) {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }
    Ok(success(&lookup))
}

fn preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_MAX_AGE, BROWSER_MAX_AGE_SECS.to_string()),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET".to_string()),
        ],
    )
        .into_response()
}

fn success(lookup: &Lookup) -> Response {
    let fetched_at = lookup.result.fetched_at;
    (
        StatusCode::OK,
        [
            (header::LAST_MODIFIED, http_date(fetched_at)),
            (header::CACHE_CONTROL, format!("public, max-age={BROWSER_MAX_AGE_SECS}")),
            (header::EXPIRES, http_date(fetched_at + TimeDelta::seconds(BROWSER_MAX_AGE_SECS))),
            (header::VARY, "Accept-Encoding".to_string()),
            (X_CACHE, lookup.cache.to_string()),
        ],
        Json(&lookup.result.metadata),
    )
        .into_response()
}

/// Query parameters; the last occurrence of a name wins.
#[derive(Debug, Default)]
struct Params {
    url: Option<String>,
    lang: Option<String>,
}

impl Params {
    fn parse(query: Option<&str>) -> Self {
        let mut params = Self::default();
        for (name, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            match name.as_ref() {
                "url" => params.url = Some(value.into_owned()),
                "lang" => params.lang = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

fn has_http_scheme(target: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|prefix| target.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix)))
}

/// Whether `target` names the host this request was addressed to.
fn targets_self(target: &str, headers: &HeaderMap) -> bool {
    let Some(own) = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Authority::from_str(v).ok())
    else {
        return false;
    };
    url::Url::parse(target)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(own.host())))
        .unwrap_or(false)
}

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn not_modified(headers: &HeaderMap, fetched_at: DateTime<Utc>) -> bool {
    headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
        .is_some_and(|since| since.timestamp() == fetched_at.timestamp())
}
