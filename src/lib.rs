//! manga-edge: edge proxy and response cache for a MangaDex-backed manga reader.
//!
//! The proxy ([`proxy::router`]) fronts the upstream JSON API and uploads host with a
//! shared TTL cache, a per-client sliding-window rate limiter and a 429-aware upstream
//! client. The [`reader`] module is the client half: it resolves chapters through the
//! proxy, retries transient failures and prefetches the next chapter.
//!
//! ```no_run
//! # async fn run() -> Result<(), manga_edge::EdgeError> {
//! use manga_edge::{AppState, UpstreamClient, proxy};
//!
//! let state = AppState::new(UpstreamClient::builder().build()?);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! proxy::serve(listener, state, std::future::pending()).await
//! # }
//! ```

pub mod chapter;
pub mod config;
pub mod core;
pub mod cover;
#[cfg(feature = "tracing-subscriber")]
pub mod logging;
pub mod manga;
pub mod proxy;
pub mod reader;

pub use chapter::{ChapterResource, PageQuality};
pub use crate::core::{
    Backoff, CacheMode, CacheState, EdgeError, Payload, RateLimiter, ResponseCache,
    RetryConfig, UpstreamClient, UpstreamClientBuilder,
};
pub use cover::CoverRequest;
pub use manga::MangaRequest;
pub use proxy::{AppState, LimitPolicy, ProxySettings};
pub use reader::{
    ChapterSource, HttpChapterSource, PresentationMode, ReaderSequencer, ReaderState,
    SequencerConfig,
};
