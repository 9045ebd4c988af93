use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use url::Url;

use crate::chapter::{ChapterResource, parse_at_home};
use crate::core::{EdgeError, ResponseCache};

/// Boxed future returned by [`ChapterSource`] methods.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, EdgeError>> + Send + 'a>>;

/// Where the reader gets chapter descriptors and page bytes from.
///
/// Implemented by [`HttpChapterSource`]; tests substitute their own.
pub trait ChapterSource: Send + Sync + 'static {
    /// Resolves a chapter id to its page resources.
    fn resolve<'a>(&'a self, chapter_id: &'a str) -> SourceFuture<'a, ChapterResource>;

    /// Fetches one page image.
    fn fetch_page<'a>(&'a self, url: &'a str) -> SourceFuture<'a, Bytes>;
}

const DEFAULT_CHAPTER_TTL: Duration = Duration::from_secs(600);
const DEFAULT_PAGE_TTL: Duration = Duration::from_secs(600);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(25);

/// Reads through the proxy's `/api/chapter/{id}` route and deduplicates within a session.
///
/// Resolved chapters and fetched pages are kept in session caches, so a prefetched
/// chapter is served locally when the reader advances to it.
#[derive(Debug, Clone)]
pub struct HttpChapterSource {
    http: reqwest::Client,
    proxy_base: Url,
    chapters: ResponseCache<ChapterResource>,
    pages: ResponseCache<Bytes>,
    chapter_ttl: Duration,
    page_ttl: Duration,
}

impl HttpChapterSource {
    /// A source talking to the proxy at `proxy_base` (e.g. `http://localhost:8080/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(proxy_base: Url) -> Result<Self, EdgeError> {
        Self::with_timeout(proxy_base, DEFAULT_TIMEOUT)
    }

    /// Like [`HttpChapterSource::new`] with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_timeout(proxy_base: Url, timeout: Duration) -> Result<Self, EdgeError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            proxy_base,
            chapters: ResponseCache::new(),
            pages: ResponseCache::new(),
            chapter_ttl: DEFAULT_CHAPTER_TTL,
            page_ttl: DEFAULT_PAGE_TTL,
        })
    }

    /// Overrides the session cache TTLs.
    #[must_use]
    pub const fn cache_ttls(mut self, chapter_ttl: Duration, page_ttl: Duration) -> Self {
        self.chapter_ttl = chapter_ttl;
        self.page_ttl = page_ttl;
        self
    }

    /// Forgets every resolved chapter and cached page.
    pub async fn clear_cache(&self) {
        self.chapters.clear().await;
        self.pages.clear().await;
    }

    fn chapter_url(&self, chapter_id: &str) -> Result<Url, EdgeError> {
        let mut url = self.proxy_base.join("api/chapter/")?;
        url.path_segments_mut()
            .map_err(|()| EdgeError::Data("proxy base cannot carry a path".into()))?
            .pop_if_empty()
            .push(chapter_id);
        Ok(url)
    }

    async fn get_bytes(&self, url: Url) -> Result<Bytes, EdgeError> {
        let resp = self.http.get(url.clone()).send().await.map_err(|e| timeout_or(e, &url))?;
        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let url = url.to_string();
            return Err(match status {
                429 => EdgeError::RateLimited { url },
                504 => EdgeError::Timeout { url },
                _ => EdgeError::Status { status, url },
            });
        }
        resp.bytes().await.map_err(|e| timeout_or(e, &url))
    }

    async fn resolve_cached(&self, chapter_id: &str) -> Result<ChapterResource, EdgeError> {
        if let Some(hit) = self.chapters.get(chapter_id).await {
            return Ok(hit);
        }
        let body = self.get_bytes(self.chapter_url(chapter_id)?).await?;
        let chapter = parse_at_home(chapter_id, &body)?;
        self.chapters
            .set(chapter_id, chapter.clone(), self.chapter_ttl)
            .await;
        Ok(chapter)
    }

    async fn page(&self, url: &str) -> Result<Bytes, EdgeError> {
        if let Some(hit) = self.pages.get(url).await {
            return Ok(hit);
        }
        let bytes = self.get_bytes(Url::parse(url)?).await?;
        self.pages.set(url, bytes.clone(), self.page_ttl).await;
        Ok(bytes)
    }
}

fn timeout_or(e: reqwest::Error, url: &Url) -> EdgeError {
    if e.is_timeout() {
        EdgeError::Timeout {
            url: url.to_string(),
        }
    } else {
        EdgeError::Http(e)
    }
}

impl ChapterSource for HttpChapterSource {
    fn resolve<'a>(&'a self, chapter_id: &'a str) -> SourceFuture<'a, ChapterResource> {
        Box::pin(self.resolve_cached(chapter_id))
    }

    fn fetch_page<'a>(&'a self, url: &'a str) -> SourceFuture<'a, Bytes> {
        Box::pin(self.page(url))
    }
}
