use bytes::Bytes;

/// Raw answer from one upstream attempt.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header, when the upstream sent one.
    pub content_type: Option<String>,
    /// Full response body.
    pub body: Bytes,
}

impl UpstreamResponse {
    /// `true` for 2xx statuses.
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Converts into a cacheable payload, falling back to `default_type` for the content type.
    pub fn into_payload(self, default_type: &str) -> Payload {
        Payload {
            content_type: self.content_type.unwrap_or_else(|| default_type.to_owned()),
            body: self.body,
        }
    }
}

/// An opaque cached value: a JSON document or a binary buffer plus its media type.
///
/// Cloning is cheap; the body is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub content_type: String,
    pub body: Bytes,
}

impl Payload {
    /// A JSON payload.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self {
            content_type: "application/json".to_owned(),
            body: body.into(),
        }
    }
}

/// Whether a response was served from the cache. Rendered as the `X-Cache` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Hit,
    Miss,
}

impl CacheState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}
