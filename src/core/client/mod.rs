//! Public client surface + builder.
//! Internals are split into `retry` (policy + state machine) and `constants` (UA + defaults).

mod constants;
mod retry;

pub use retry::{Backoff, CacheMode, RetryAttempt, RetryConfig, backoff_delay, should_retry};

use crate::core::{EdgeError, UpstreamResponse, net};
use constants::{
    DEFAULT_BASE_API, DEFAULT_BASE_UPLOADS, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REFERER,
    DEFAULT_TIMEOUT, USER_AGENT,
};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, REFERER};
use std::time::Duration;
use url::Url;

/// HTTP client for the upstream content API.
///
/// Every attempt is bounded by the builder's timeout. Throttled answers (429) are
/// retried according to the client's [`RetryConfig`] unless a per-call override is given.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    base_api: Url,
    base_uploads: Url,
    referer: HeaderValue,
    timeout: Duration,
    retry: RetryConfig,
}

impl Default for UpstreamClient {
    fn default() -> Self {
        Self::builder().build().expect("default client")
    }
}

impl UpstreamClient {
    /// Create a new builder.
    pub fn builder() -> UpstreamClientBuilder {
        UpstreamClientBuilder::default()
    }

    /* -------- internal getters used by other modules -------- */

    pub(crate) fn base_api(&self) -> &Url {
        &self.base_api
    }
    pub(crate) fn base_uploads(&self) -> &Url {
        &self.base_uploads
    }

    /// The default retry policy applied when a call passes no override.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Fetches a JSON resource.
    ///
    /// # Errors
    ///
    /// See [`UpstreamClient::send_with_retry`].
    pub async fn fetch_json(
        &self,
        url: Url,
        retry_override: Option<&RetryConfig>,
    ) -> Result<UpstreamResponse, EdgeError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        self.send_with_retry(url, headers, retry_override).await
    }

    /// Fetches a binary asset (cover image) with the configured referer.
    ///
    /// # Errors
    ///
    /// See [`UpstreamClient::send_with_retry`].
    pub async fn fetch_asset(
        &self,
        url: Url,
        retry_override: Option<&RetryConfig>,
    ) -> Result<UpstreamResponse, EdgeError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("image/*"));
        headers.insert(REFERER, self.referer.clone());
        self.send_with_retry(url, headers, retry_override).await
    }

    /// Sends a GET, retrying only on the statuses the retry policy names.
    ///
    /// # Errors
    ///
    /// - [`EdgeError::Timeout`] when an attempt outlives the timeout; never retried here.
    /// - [`EdgeError::Exhausted`] when every allowed attempt was throttled.
    /// - [`EdgeError::RateLimited`] for a 429 the policy does not retry.
    /// - [`EdgeError::Status`] for any other non-2xx answer, on the first occurrence.
    /// - [`EdgeError::Http`] for transport failures.
    #[tracing::instrument(skip(self, url, headers, retry_override), fields(url = %url))]
    pub async fn send_with_retry(
        &self,
        url: Url,
        headers: HeaderMap,
        retry_override: Option<&RetryConfig>,
    ) -> Result<UpstreamResponse, EdgeError> {
        let cfg = retry_override.unwrap_or(&self.retry);
        let mut attempt = RetryAttempt::first(cfg);

        loop {
            if !attempt.delay.is_zero() {
                tokio::time::sleep(attempt.delay).await;
            }

            let resp = self.attempt_once(&url, &headers).await?;
            if resp.is_success() {
                return Ok(resp);
            }

            let status = resp.status;
            tracing::debug!(
                status,
                attempt = attempt.attempt,
                body = %String::from_utf8_lossy(&resp.body[..resp.body.len().min(256)]),
                "upstream answered with an error status"
            );

            if should_retry(cfg, &attempt, status)
                && let Some(next) = attempt.next(cfg)
            {
                tracing::warn!(
                    status,
                    attempt = attempt.attempt,
                    max_attempts = attempt.max_attempts,
                    delay_ms = u64::try_from(next.delay.as_millis()).unwrap_or(u64::MAX),
                    "upstream throttled, backing off"
                );
                attempt = next;
                continue;
            }

            let url = url.to_string();
            return Err(match status {
                429 if attempt.is_last() && attempt.attempt > 1 => {
                    tracing::warn!(attempts = attempt.attempt, "retry budget exhausted");
                    EdgeError::Exhausted {
                        attempts: attempt.attempt,
                        url,
                    }
                }
                429 => EdgeError::RateLimited { url },
                _ => EdgeError::Status { status, url },
            });
        }
    }

    async fn attempt_once(
        &self,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<UpstreamResponse, EdgeError> {
        let send = async {
            let resp = self
                .http
                .get(url.clone())
                .headers(headers.clone())
                .send()
                .await?;
            net::read_response(resp).await
        };

        match tokio::time::timeout(self.timeout, send).await {
            Err(_) => Err(EdgeError::Timeout {
                url: url.to_string(),
            }),
            Ok(Err(e)) if e.is_timeout() => Err(EdgeError::Timeout {
                url: url.to_string(),
            }),
            Ok(Err(e)) => Err(EdgeError::Http(e)),
            Ok(Ok(resp)) => Ok(resp),
        }
    }
}

/* ----------------------- Builder ----------------------- */

#[derive(Default)]
pub struct UpstreamClientBuilder {
    user_agent: Option<String>,
    base_api: Option<Url>,
    base_uploads: Option<Url>,
    referer: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    retry: Option<RetryConfig>,
}

impl UpstreamClientBuilder {
    /// Override the User-Agent.
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Override the JSON API base (e.g., `https://api.mangadex.org/`).
    #[must_use]
    pub fn base_api(mut self, url: Url) -> Self {
        self.base_api = Some(url);
        self
    }

    /// Override the uploads base serving cover images (e.g., `https://uploads.mangadex.org/`).
    #[must_use]
    pub fn base_uploads(mut self, url: Url) -> Self {
        self.base_uploads = Some(url);
        self
    }

    /// Override the referer sent with asset fetches.
    #[must_use]
    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Per-attempt timeout. Default: 25 seconds.
    #[must_use]
    pub const fn timeout(mut self, dur: Duration) -> Self {
        self.timeout = Some(dur);
        self
    }

    /// Connect timeout. Default: 10 seconds.
    #[must_use]
    pub const fn connect_timeout(mut self, dur: Duration) -> Self {
        self.connect_timeout = Some(dur);
        self
    }

    /// Sets the default retry policy.
    #[must_use]
    pub fn retry_config(mut self, cfg: RetryConfig) -> Self {
        self.retry = Some(cfg);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if a default URL fails to parse, the referer is not a valid
    /// header value, or the HTTP client cannot be constructed.
    pub fn build(self) -> Result<UpstreamClient, EdgeError> {
        let base_api = match self.base_api {
            Some(u) => u,
            None => Url::parse(DEFAULT_BASE_API)?,
        };
        let base_uploads = match self.base_uploads {
            Some(u) => u,
            None => Url::parse(DEFAULT_BASE_UPLOADS)?,
        };
        let referer = HeaderValue::from_str(self.referer.as_deref().unwrap_or(DEFAULT_REFERER))
            .map_err(|_| EdgeError::InvalidRequest("referer is not a valid header value".into()))?;

        let http = reqwest::Client::builder()
            .user_agent(self.user_agent.as_deref().unwrap_or(USER_AGENT))
            .connect_timeout(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
            .build()?;

        Ok(UpstreamClient {
            http,
            base_api,
            base_uploads,
            referer,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            retry: self.retry.unwrap_or_default(),
        })
    }
}
