//! HTTP surface toward the browser.
//!
//! Each route validates its parameters, consults the local rate limiter and the shared
//! [`ResponseCache`], and only then calls the upstream. Every response, including
//! failures, carries the same CORS headers.

mod client_key;
mod cors;
mod handlers;
mod response;

pub use client_key::ClientKey;
pub use cors::{ALLOW_HEADERS, ALLOW_METHODS, ALLOW_ORIGIN};
pub use response::X_CACHE;

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::core::{EdgeError, Payload, RateLimiter, ResponseCache, RetryConfig, UpstreamClient};

/// What a route does with a caller over the local rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitPolicy {
    /// Answer 429 with `Retry-After`.
    Reject,
    /// Wait once, then check the window again; still over the limit means 429.
    Delay(Duration),
}

/// Per-resource TTLs, retry and limit policies.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// At-home server descriptors.
    pub chapter_ttl: Duration,
    /// Manga chapter feeds.
    pub feed_ttl: Duration,
    /// Search listings.
    pub listing_ttl: Duration,
    /// Cover images; immutable once published.
    pub cover_ttl: Duration,
    /// Retry policy for JSON routes. Covers use the client's default policy.
    pub json_retry: RetryConfig,
    pub json_limit: LimitPolicy,
    pub cover_limit: LimitPolicy,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            chapter_ttl: Duration::from_secs(600),
            feed_ttl: Duration::from_secs(600),
            listing_ttl: Duration::from_secs(300),
            cover_ttl: Duration::from_secs(86_400),
            json_retry: RetryConfig::disabled(),
            json_limit: LimitPolicy::Reject,
            cover_limit: LimitPolicy::Reject,
        }
    }
}

/// Shared state passed to all handlers via `State<AppState>`.
///
/// Built once at startup; tests build a fresh one per case.
#[derive(Debug, Clone)]
pub struct AppState {
    pub client: UpstreamClient,
    pub cache: ResponseCache<Payload>,
    pub limiter: RateLimiter,
    pub settings: ProxySettings,
}

impl AppState {
    /// State with an empty unbounded cache and the default limiter (5 requests per second).
    pub fn new(client: UpstreamClient) -> Self {
        Self {
            client,
            cache: ResponseCache::new(),
            limiter: RateLimiter::default(),
            settings: ProxySettings::default(),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: ResponseCache<Payload>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ProxySettings) -> Self {
        self.settings = settings;
        self
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Builds the proxy router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/chapter/{id}",
            get(handlers::chapter).options(cors::preflight),
        )
        .route(
            "/api/manga",
            get(handlers::manga_listing).options(cors::preflight),
        )
        .route(
            "/api/manga/{id}",
            get(handlers::manga_detail).options(cors::preflight),
        )
        .route("/api/cover", get(handlers::cover).options(cors::preflight))
        .fallback(not_found)
        .layer(middleware::map_response(cors::apply_cors))
        .with_state(state)
}

/// Serves the router on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`EdgeError::Io`] if the server fails.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), EdgeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Periodically purges expired cache entries and idle limiter windows.
///
/// Lazy expiry stays the contract; this only bounds memory when the key space is open-ended.
pub fn spawn_sweeper(state: &AppState, every: Duration) -> JoinHandle<()> {
    let cache = state.cache.clone();
    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            let purged = cache.purge_expired().await;
            let idle = limiter.prune_idle();
            if purged > 0 || idle > 0 {
                tracing::debug!(purged, idle, "sweep");
            }
        }
    })
}
