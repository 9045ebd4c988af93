use std::time::Duration;

/// Specifies the backoff strategy for retrying failed requests.
///
/// Every strategy yields a non-decreasing delay as the attempt number grows.
#[derive(Clone, Debug, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed(Duration),
    /// Waits `step * attempt` after the given failed attempt, capped at `max`.
    Linear {
        /// Delay added per failed attempt.
        step: Duration,
        /// The maximum duration to wait between retries.
        max: Duration,
    },
    /// Uses an exponential delay between retries.
    /// The delay is calculated as `base * (factor ^ (attempt - 1))`.
    Exponential {
        /// The initial backoff duration.
        base: Duration,
        /// The multiplicative factor for each subsequent retry. Values below 1.0 are treated as 1.0.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
    },
}

/// Configuration for the automatic retry mechanism.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Enables or disables the retry mechanism.
    pub enabled: bool,
    /// Total number of attempts, the first one included.
    pub max_attempts: u32,
    /// The backoff strategy to use between retries.
    pub backoff: Backoff,
    /// HTTP status codes that should trigger a retry. Upstream throttling (429) only, by default.
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            backoff: Backoff::Linear {
                step: Duration::from_secs(1),
                max: Duration::from_secs(5),
            },
            retry_on_status: vec![429],
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub(crate) fn effective_max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

/// Defines the behavior of the in-memory cache for an API call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read from the cache if a non-expired entry is present; otherwise, fetch from the network
    /// and write the response to the cache. (Default)
    #[default]
    Use,
    /// Always fetch from the network, bypassing any cached entry, and write the new response to the cache.
    Refresh,
    /// Always fetch from the network and do not read from or write to the cache.
    Bypass,
}

impl CacheMode {
    pub(crate) const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub(crate) const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}

/// One step of the retry state machine for a single logical request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Ceiling for `attempt`.
    pub max_attempts: u32,
    /// Delay to wait before this attempt is sent. Zero for the first one.
    pub delay: Duration,
}

impl RetryAttempt {
    /// The initial attempt for a request governed by `cfg`.
    pub fn first(cfg: &RetryConfig) -> Self {
        Self {
            attempt: 1,
            max_attempts: cfg.effective_max_attempts(),
            delay: Duration::ZERO,
        }
    }

    /// The attempt following this one, or `None` once the ceiling is reached.
    pub fn next(&self, cfg: &RetryConfig) -> Option<Self> {
        (self.attempt < self.max_attempts).then(|| Self {
            attempt: self.attempt + 1,
            max_attempts: self.max_attempts,
            delay: backoff_delay(cfg, self.attempt),
        })
    }

    /// `true` if no further attempt is allowed after this one.
    pub const fn is_last(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Decides whether a response with `status` on `attempt` warrants another try.
pub fn should_retry(cfg: &RetryConfig, attempt: &RetryAttempt, status: u16) -> bool {
    cfg.enabled && !attempt.is_last() && cfg.retry_on_status.contains(&status)
}

/// Delay to wait after `failed_attempt` (1-based) before the next one.
pub fn backoff_delay(cfg: &RetryConfig, failed_attempt: u32) -> Duration {
    let n = failed_attempt.max(1);
    match &cfg.backoff {
        Backoff::Fixed(d) => *d,
        Backoff::Linear { step, max } => step.saturating_mul(n).min(*max),
        Backoff::Exponential { base, factor, max } => {
            let exp = i32::try_from(n - 1).unwrap_or(i32::MAX);
            let mult = factor.max(1.0).powi(exp);
            let secs = (base.as_secs_f64() * mult).min(max.as_secs_f64());
            Duration::from_secs_f64(secs)
        }
    }
}
