//! Cover image fetches from the uploads host.
//!
//! Covers are immutable once published, so they are cached for a day and served with a
//! long-lived `Cache-Control`. The uploads host throttles aggressively; fetches go through
//! the client's 429 retry policy.

use url::{Url, form_urlencoded};

use crate::core::{EdgeError, Payload, RetryConfig, UpstreamClient};

/// Content type assumed when the uploads host omits one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// `Cache-Control` sent with successful cover responses.
pub const CACHE_CONTROL: &str = "public, s-maxage=604800, stale-while-revalidate=86400";

/// A validated cover lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverRequest {
    pub manga_id: String,
    pub file_name: String,
}

impl CoverRequest {
    /// Validates the two required parameters.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidRequest`] if either parameter is absent or blank.
    pub fn new(manga_id: Option<&str>, file_name: Option<&str>) -> Result<Self, EdgeError> {
        let present = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned);
        match (present(manga_id), present(file_name)) {
            (Some(manga_id), Some(file_name)) => Ok(Self { manga_id, file_name }),
            _ => Err(EdgeError::InvalidRequest(
                "Missing mangaId or fileName parameter".into(),
            )),
        }
    }

    /// `cover:{mangaId}/{fileName}` with each component percent-encoded, so a `/` inside
    /// either one cannot alias another cover.
    pub fn cache_key(&self) -> String {
        let encode = |s: &str| form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>();
        format!("cover:{}/{}", encode(&self.manga_id), encode(&self.file_name))
    }

    fn url(&self, client: &UpstreamClient) -> Result<Url, EdgeError> {
        let mut url = client.base_uploads().join("covers/")?;
        url.path_segments_mut()
            .map_err(|()| EdgeError::Data("uploads base cannot carry a path".into()))?
            .pop_if_empty()
            .push(&self.manga_id)
            .push(&self.file_name);
        Ok(url)
    }
}

/// Fetches a cover image, retrying on upstream throttling.
///
/// # Errors
///
/// Returns [`EdgeError::Exhausted`] if every attempt was throttled, or any other
/// error from the upstream client.
#[tracing::instrument(skip(client, retry_override), fields(manga_id = %request.manga_id, file = %request.file_name), err)]
pub async fn fetch_cover(
    client: &UpstreamClient,
    request: &CoverRequest,
    retry_override: Option<&RetryConfig>,
) -> Result<Payload, EdgeError> {
    let url = request.url(client)?;
    let resp = client.fetch_asset(url, retry_override).await?;
    Ok(resp.into_payload(DEFAULT_CONTENT_TYPE))
}
