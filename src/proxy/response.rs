//! Success and failure response shapes.

use axum::Json;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, RETRY_AFTER};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::core::{CacheState, EdgeError, Payload};

/// Header reporting whether a cacheable response was a hit or a miss.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Seconds a throttled caller should wait, sent as `Retry-After`.
const RETRY_AFTER_SECS: &str = "1";

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// A payload answer, optionally annotated with its cache state.
pub(crate) fn payload_response(payload: Payload, cache: Option<CacheState>) -> Response {
    let content_type = HeaderValue::from_str(&payload.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let mut res = (StatusCode::OK, payload.body).into_response();
    let headers = res.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    if let Some(state) = cache {
        headers.insert(X_CACHE, HeaderValue::from_static(state.as_str()));
    }
    res
}

/// Adds `Cache-Control` to an already built response.
pub(crate) fn with_cache_control(mut res: Response, value: &'static str) -> Response {
    res.headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static(value));
    res
}

/// Boundary error: maps an [`EdgeError`] to a status and a JSON body.
///
/// `context` is the message used when the failure is not one the caller can act on.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) context: &'static str,
    pub(crate) error: EdgeError,
}

impl ApiError {
    pub(crate) const fn new(context: &'static str, error: EdgeError) -> Self {
        Self { context, error }
    }

    pub(crate) fn status(&self) -> StatusCode {
        match &self.error {
            EdgeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            EdgeError::LocalRateLimited { .. }
            | EdgeError::RateLimited { .. }
            | EdgeError::Exhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
            EdgeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            EdgeError::Status { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, details) = match &self.error {
            EdgeError::InvalidRequest(msg) => (msg.clone(), None),
            EdgeError::LocalRateLimited { .. } => {
                ("Rate limit exceeded. Please slow down.".to_owned(), None)
            }
            EdgeError::RateLimited { .. } | EdgeError::Exhausted { .. } => (
                "Upstream API is rate limiting requests".to_owned(),
                Some(self.error.to_string()),
            ),
            EdgeError::Timeout { .. } => ("Request timeout".to_owned(), None),
            EdgeError::Status { status, .. } => (format!("Upstream API returned {status}"), None),
            other => (self.context.to_owned(), Some(other.to_string())),
        };

        match status.as_u16() {
            400..=499 => tracing::debug!(status = status.as_u16(), error = %self.error, "request failed"),
            504 => tracing::warn!(error = %self.error, "upstream timeout"),
            _ => tracing::error!(status = status.as_u16(), error = %self.error, "{}", self.context),
        }

        let mut res = (
            status,
            Json(ErrorBody {
                error: &message,
                details,
            }),
        )
            .into_response();
        if status == StatusCode::TOO_MANY_REQUESTS {
            res.headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        res
    }
}
