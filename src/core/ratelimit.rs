//! Per-client sliding-window request limiter.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Requests admitted per client within one window (matches the upstream's own ceiling).
pub const DEFAULT_MAX_REQUESTS: usize = 5;
/// Trailing window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Sliding-window counter keyed by client (origin IP, or `unknown`).
///
/// Pruning, the threshold check and recording the new request happen under one lock,
/// so concurrent admissions for the same client are never undercounted.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Records a request from `client_key` and reports whether it may proceed.
    pub fn admit(&self, client_key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let stamps = windows.entry(client_key.to_owned()).or_default();
        prune(stamps, now, self.window);

        if stamps.len() >= self.max_requests {
            tracing::debug!(client = client_key, in_window = stamps.len(), "request rejected by local limiter");
            return false;
        }
        stamps.push_back(now);
        true
    }

    /// Drops clients with no request inside the current window; returns how many.
    pub fn prune_idle(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|_, stamps| {
            prune(stamps, now, self.window);
            !stamps.is_empty()
        });
        before - windows.len()
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = stamps.front() {
        if now.duration_since(oldest) < window {
            break;
        }
        stamps.pop_front();
    }
}
