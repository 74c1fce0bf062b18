//! Response-cached metadata lookups.

use std::fmt;
use std::sync::Arc;

use metafetch_core::{AppConfig, Caches, CrawlResult, ResponseCache};

use crate::crawl::Crawler;
use crate::error::{CrawlError, TransportError};
use crate::fetch::{FetchConfig, HttpTransport, Transport, normalize};

/// Whether a result came from the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A crawl result and where it came from.
#[derive(Debug, Clone)]
pub struct Lookup {
    pub result: CrawlResult,
    pub cache: CacheStatus,
}

/// Front door for metadata: normalize, consult the response cache, crawl on
/// a miss or stale entry, write through.
#[derive(Clone)]
pub struct MetadataService {
    crawler: Crawler,
    responses: ResponseCache,
    default_lang: String,
}

impl MetadataService {
    pub fn new(crawler: Crawler, responses: ResponseCache, default_lang: impl Into<String>) -> Self {
        Self { crawler, responses, default_lang: default_lang.into() }
    }

    /// Wire a service over `transport` and the shared caches.
    pub fn with_transport(config: &AppConfig, caches: &Caches, transport: Arc<dyn Transport>) -> Self {
        let crawler = Crawler::new(transport, caches.policies.clone(), config);
        Self::new(crawler, caches.responses.clone(), config.default_lang.clone())
    }

    /// Wire a service over a reqwest transport built from `config`.
    pub fn from_config(config: &AppConfig, caches: &Caches) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(FetchConfig::from(config))?;
        Ok(Self::with_transport(config, caches, Arc::new(transport)))
    }

    fn lang<'a>(&'a self, lang: Option<&'a str>) -> &'a str {
        lang.map(str::trim).filter(|l| !l.is_empty()).unwrap_or(self.default_lang.as_str())
    }

    /// Metadata for `raw_url`, from the response cache when fresh.
    ///
    /// # Errors
    ///
    /// - [`CrawlError::InvalidUrl`] before any network activity
    /// - [`CrawlError::Denied`] when the page is refused
    /// - [`CrawlError::Transport`] when the network fails
    pub async fn get(&self, raw_url: &str, lang: Option<&str>) -> Result<Lookup, CrawlError> {
        let url = normalize(raw_url)?;
        let lang = self.lang(lang);

        match self.responses.lookup(url.as_str(), lang).await {
            Some(cached) if cached.fresh => {
                tracing::debug!(url = %url, lang, "response cache hit");
                return Ok(Lookup { result: cached.payload, cache: CacheStatus::Hit });
            }
            Some(_) => tracing::debug!(url = %url, lang, "response cache stale"),
            None => tracing::debug!(url = %url, lang, "response cache miss"),
        }

        let result = self.crawler.crawl(&url, lang).await?;
        if !self.responses.save(url.as_str(), lang, &result).await {
            tracing::warn!(url = %url, lang, "failed to cache crawl result");
        }

        Ok(Lookup { result, cache: CacheStatus::Miss })
    }

    /// Crawl without reading or writing the response cache.
    pub async fn get_uncached(&self, raw_url: &str, lang: Option<&str>) -> Result<CrawlResult, CrawlError> {
        let url = normalize(raw_url)?;
        self.crawler.crawl(&url, self.lang(lang)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Rejection, UrlError};
    use metafetch_core::cache::SqliteBackend;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html lang="en"><head><title>Cached</title></head></html>"#;

    async fn service() -> (MetadataService, Caches) {
        service_with(AppConfig::default()).await
    }

    async fn service_with(config: AppConfig) -> (MetadataService, Caches) {
        let backend = Arc::new(SqliteBackend::open_in_memory().await.unwrap());
        let caches = Caches::with_backend(backend, &config);
        (MetadataService::from_config(&config, &caches).unwrap(), caches)
    }

    async fn mount_site(server: &MockServer, page_hits: u64) {
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html"))
            .expect(page_hits)
            .mount(server)
            .await;
    }

    #[test]
    fn test_cache_status_strings() {
        assert_eq!(CacheStatus::Hit.to_string(), "HIT");
        assert_eq!(CacheStatus::Miss.as_str(), "MISS");
    }

    #[tokio::test]
    async fn test_second_lookup_is_cache_hit() {
        let server = MockServer::start().await;
        mount_site(&server, 1).await;
        let (service, _caches) = service().await;

        let first = service.get(&server.uri(), Some("en")).await.unwrap();
        assert_eq!(first.cache, CacheStatus::Miss);
        assert_eq!(first.result.metadata.title, "Cached");

        // Fragment and explicit root path normalize to the same key.
        let second = service.get(&format!("{}/#section", server.uri()), None).await.unwrap();
        assert_eq!(second.cache, CacheStatus::Hit);
        assert_eq!(second.result, first.result);
    }

    #[tokio::test]
    async fn test_stale_entry_is_recrawled() {
        let server = MockServer::start().await;
        mount_site(&server, 2).await;
        let (service, _caches) = service_with(AppConfig { response_max_age_secs: 1, ..Default::default() }).await;

        assert_eq!(service.get(&server.uri(), None).await.unwrap().cache, CacheStatus::Miss);

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

        let refreshed = service.get(&server.uri(), None).await.unwrap();
        assert_eq!(refreshed.cache, CacheStatus::Miss);
        assert_eq!(refreshed.result.metadata.title, "Cached");

        // The refreshed crawl was written back.
        assert_eq!(service.get(&server.uri(), None).await.unwrap().cache, CacheStatus::Hit);
    }

    #[tokio::test]
    async fn test_languages_cached_separately() {
        let server = MockServer::start().await;
        mount_site(&server, 2).await;
        let (service, _caches) = service().await;

        assert_eq!(service.get(&server.uri(), Some("en")).await.unwrap().cache, CacheStatus::Miss);
        assert_eq!(service.get(&server.uri(), Some("ja")).await.unwrap().cache, CacheStatus::Miss);
        assert_eq!(service.get(&server.uri(), Some("ja")).await.unwrap().cache, CacheStatus::Hit);
    }

    #[tokio::test]
    async fn test_uncached_always_crawls() {
        let server = MockServer::start().await;
        mount_site(&server, 2).await;
        let (service, caches) = service().await;

        service.get_uncached(&server.uri(), None).await.unwrap();
        service.get_uncached(&server.uri(), None).await.unwrap();
        let key = format!("{}/", server.uri());
        assert!(caches.responses.lookup(&key, "en").await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_network() {
        let (service, _caches) = service().await;
        assert!(matches!(
            service.get("ftp://example.com/", None).await,
            Err(CrawlError::InvalidUrl(UrlError::UnsupportedScheme(_)))
        ));
    }

    #[tokio::test]
    async fn test_rejections_are_not_response_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;
        let (service, _caches) = service().await;

        for _ in 0..2 {
            assert!(matches!(
                service.get(&server.uri(), None).await,
                Err(CrawlError::Denied(Rejection::UpstreamStatus(500)))
            ));
        }
    }
}
