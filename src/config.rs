//! Command-line and environment configuration for the `manga-edge` binary.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::core::{EdgeError, RateLimiter, ResponseCache, RetryConfig, UpstreamClient};
use crate::proxy::{AppState, ProxySettings};

/// Edge proxy for a MangaDex-backed reader.
///
/// Every flag can also be set through the environment variable shown in `--help`.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "MANGA_EDGE_LISTEN")]
    pub listen: SocketAddr,

    /// JSON API base URL (default: https://api.mangadex.org/)
    #[arg(long, env = "MANGA_EDGE_API_BASE")]
    pub api_base: Option<Url>,

    /// Uploads base URL serving covers (default: https://uploads.mangadex.org/)
    #[arg(long, env = "MANGA_EDGE_UPLOADS_BASE")]
    pub uploads_base: Option<Url>,

    /// User-Agent sent upstream
    #[arg(long, env = "MANGA_EDGE_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Referer sent with cover fetches
    #[arg(long, env = "MANGA_EDGE_REFERER")]
    pub referer: Option<String>,

    /// Per-attempt upstream timeout in seconds
    #[arg(long, default_value_t = 25, env = "MANGA_EDGE_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// Attempts per cover fetch while the upstream answers 429
    #[arg(long, default_value_t = 3, env = "MANGA_EDGE_COVER_ATTEMPTS")]
    pub cover_attempts: u32,

    /// Requests admitted per client per window
    #[arg(long, default_value_t = 5, env = "MANGA_EDGE_RATE_LIMIT")]
    pub rate_limit: usize,

    /// Rate limit window in milliseconds
    #[arg(long, default_value_t = 1000, env = "MANGA_EDGE_RATE_WINDOW_MS")]
    pub rate_window_ms: u64,

    /// Chapter descriptor TTL in seconds
    #[arg(long, default_value_t = 600, env = "MANGA_EDGE_CHAPTER_TTL")]
    pub chapter_ttl: u64,

    /// Chapter feed TTL in seconds
    #[arg(long, default_value_t = 600, env = "MANGA_EDGE_FEED_TTL")]
    pub feed_ttl: u64,

    /// Search listing TTL in seconds
    #[arg(long, default_value_t = 300, env = "MANGA_EDGE_LISTING_TTL")]
    pub listing_ttl: u64,

    /// Cover image TTL in seconds
    #[arg(long, default_value_t = 86_400, env = "MANGA_EDGE_COVER_TTL")]
    pub cover_ttl: u64,

    /// Upper bound on cached entries (unbounded when unset)
    #[arg(long, env = "MANGA_EDGE_CACHE_MAX_ENTRIES")]
    pub cache_max_entries: Option<usize>,

    /// Purge expired entries every N seconds (disabled when unset)
    #[arg(long, env = "MANGA_EDGE_SWEEP_SECS")]
    pub sweep_secs: Option<u64>,
}

impl Args {
    /// Builds the upstream client; unset options keep the client defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the referer is not a valid header value or the HTTP client
    /// cannot be constructed.
    pub fn upstream_client(&self) -> Result<UpstreamClient, EdgeError> {
        let mut retry = RetryConfig::default();
        retry.max_attempts = self.cover_attempts;

        let mut builder = UpstreamClient::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .retry_config(retry);
        if let Some(url) = &self.api_base {
            builder = builder.base_api(url.clone());
        }
        if let Some(url) = &self.uploads_base {
            builder = builder.base_uploads(url.clone());
        }
        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua);
        }
        if let Some(referer) = &self.referer {
            builder = builder.referer(referer);
        }
        builder.build()
    }

    #[must_use]
    pub fn settings(&self) -> ProxySettings {
        ProxySettings {
            chapter_ttl: Duration::from_secs(self.chapter_ttl),
            feed_ttl: Duration::from_secs(self.feed_ttl),
            listing_ttl: Duration::from_secs(self.listing_ttl),
            cover_ttl: Duration::from_secs(self.cover_ttl),
            ..ProxySettings::default()
        }
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    /// Assembles the shared proxy state.
    ///
    /// # Errors
    ///
    /// See [`Args::upstream_client`].
    pub fn app_state(&self) -> Result<AppState, EdgeError> {
        let cache = match self.cache_max_entries {
            Some(n) => ResponseCache::with_capacity_limit(n),
            None => ResponseCache::new(),
        };
        let limiter = RateLimiter::new(
            self.rate_limit,
            Duration::from_millis(self.rate_window_ms),
        );
        Ok(AppState::new(self.upstream_client()?)
            .with_cache(cache)
            .with_limiter(limiter)
            .with_settings(self.settings()))
    }
}
