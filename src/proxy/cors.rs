//! Cross-origin contract shared by every proxy response.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Response-mapping middleware: stamps the CORS headers on success and error alike,
/// router 404/405 and extractor rejections included.
pub(crate) async fn apply_cors(mut res: Response) -> Response {
    let headers = res.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ALLOW_ORIGIN));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    res
}

/// `OPTIONS` preflight: empty body, headers come from [`apply_cors`].
pub(crate) async fn preflight() -> StatusCode {
    StatusCode::OK
}
