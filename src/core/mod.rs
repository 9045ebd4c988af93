//! Core components of the `manga-edge` proxy.
//!
//! This module contains the foundational building blocks shared by the proxy routes
//! and the reader:
//! - The [`UpstreamClient`], its builder and the retry policy.
//! - The primary [`EdgeError`] type.
//! - The [`ResponseCache`] and the per-client [`RateLimiter`].

/// TTL response cache.
pub mod cache;
/// The upstream client (`UpstreamClient`), builder, and retry configuration.
pub mod client;
/// The primary error type (`EdgeError`) for the crate.
pub mod error;
/// Payload and upstream response models.
pub mod models;
pub(crate) mod net;
/// Sliding-window rate limiter.
pub mod ratelimit;

// convenient re-exports so most code can just `use crate::core::UpstreamClient`
pub use cache::ResponseCache;
pub use client::{
    Backoff, CacheMode, RetryAttempt, RetryConfig, UpstreamClient, UpstreamClientBuilder,
};
pub use error::EdgeError;
pub use models::{CacheState, Payload, UpstreamResponse};
pub use ratelimit::RateLimiter;
