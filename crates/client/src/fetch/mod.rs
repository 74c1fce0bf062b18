//! HTTP transport for page and robots.txt requests.
//!
//! ### Contract
//! - `fetch(method, url, headers, body?) -> { status, headers, body, final_url, fetched_at }`
//! - Non-2xx statuses are responses, not errors
//! - Timeouts are reported apart from other transport faults
//!
//! ### Safety Gates
//! - Request timeout (default: 5s)
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable), checked against `Content-Length`
//!   and again while the body streams in

pub mod url;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use metafetch_core::AppConfig;
use reqwest::{Client, Method, StatusCode, Url, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, normalize, robots_url};
pub use crate::error::TransportError;

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string sent when a request carries none
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 5s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// A request handed to a [`Transport`].
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: header::HeaderMap,
    pub body: Option<Bytes>,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, headers: header::HeaderMap::new(), body: None }
    }

    /// Add a header, skipping values that are not valid header text.
    pub fn header(mut self, name: header::HeaderName, value: &str) -> Self {
        match header::HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(_) => tracing::debug!(header = %name, "dropping invalid header value"),
        }
        self
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Response body bytes
    pub body: Bytes,
    /// The final URL after redirects
    pub final_url: Url,
    /// When the request was sent
    pub fetched_at: DateTime<Utc>,
}

impl FetchResponse {
    /// Content-Type header, if present and valid text.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

/// Anything that can perform a single HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, TransportError>;
}

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
    http: Client,
    config: FetchConfig,
}

impl HttpTransport {
    /// Create a new transport with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, TransportError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self { http, config })
    }

    fn classify(&self, url: &Url, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(format!("{url} did not respond within {}ms", self.config.timeout.as_millis()))
        } else if err.is_builder() {
            TransportError::Build(err.to_string())
        } else {
            TransportError::Network(format!("{url}: {err}"))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, TransportError> {
        let start = Instant::now();
        let fetched_at = Utc::now();
        let url = request.url;

        let mut builder = self.http.request(request.method, url.clone()).headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let mut response = builder.send().await.map_err(|e| self.classify(&url, e))?;

        let limit = self.config.max_bytes;
        if let Some(len) = response.content_length()
            && len > limit as u64
        {
            return Err(TransportError::TooLarge { len, limit });
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(&url, e))? {
            if body.len() + chunk.len() > limit {
                return Err(TransportError::TooLarge { len: (body.len() + chunk.len()) as u64, limit });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(
            url = %url,
            final_url = %final_url,
            status = status.as_u16(),
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(FetchResponse { status, headers, body: body.freeze(), final_url, fetched_at })
    }
}
