use thiserror::Error;

/// The primary error type for all fallible operations in this crate.
#[derive(Debug, Error)]
pub enum EdgeError {
    /// A required parameter was missing or malformed. Never reaches the upstream.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An error occurred during an HTTP request.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A payload could not be (de)serialized as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binding or serving the proxy failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The upstream returned a non-2xx status other than 429.
    #[error("Unexpected response status: {status} at {url}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The URL that returned the error.
        url: String,
    },

    /// The upstream answered 429 and retries were not enabled for this call.
    #[error("Upstream rate limited the request at {url}")]
    RateLimited {
        /// The URL that returned 429.
        url: String,
    },

    /// The local timeout elapsed before the upstream answered.
    #[error("Upstream timed out at {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// This service's own limiter rejected the caller.
    #[error("rate limit exceeded for client {client}")]
    LocalRateLimited {
        /// The client key (origin IP or `unknown`).
        client: String,
    },

    /// The retry budget ran out while the upstream kept answering 429.
    #[error("gave up after {attempts} attempts at {url}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The URL being fetched.
        url: String,
    },

    /// The data received from the API was in an unexpected format or was missing a required field.
    #[error("Data format unexpected or missing field: {0}")]
    Data(String),
}

impl EdgeError {
    /// Whether an application-level caller may reasonably try again.
    ///
    /// Missing data, timeouts, upstream throttling and 5xx answers are transient;
    /// client errors and local failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Data(_)
            | Self::Json(_)
            | Self::Timeout { .. }
            | Self::RateLimited { .. }
            | Self::Exhausted { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::InvalidRequest(_)
            | Self::Url(_)
            | Self::Io(_)
            | Self::LocalRateLimited { .. } => false,
        }
    }
}
