use url::Url;
use url::form_urlencoded;

use crate::core::{EdgeError, Payload, RetryConfig, UpstreamClient, net};

/// Query flag selecting the chapter feed instead of the manga document.
const FEED_FLAG: &str = "feed";

/// Canonical form of a query: pairs sorted by key then value, url-encoded.
///
/// Two requests that differ only in parameter order map to the same cache key.
pub fn normalize_params(params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(sorted.into_iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}

/// A request against `/manga/{id}`: either the manga document or its chapter feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MangaRequest {
    /// `/manga/{id}`; not cached.
    Detail {
        id: String,
        params: Vec<(String, String)>,
    },
    /// `/manga/{id}/feed`; cached when the answer carries data.
    Feed {
        id: String,
        params: Vec<(String, String)>,
    },
}

impl MangaRequest {
    /// Splits the `feed` flag off the caller's parameters.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidRequest`] for a blank id.
    pub fn from_params(id: &str, params: Vec<(String, String)>) -> Result<Self, EdgeError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(EdgeError::InvalidRequest("missing manga id".into()));
        }

        let is_feed = params.iter().any(|(k, v)| k == FEED_FLAG && v == "true");
        let params: Vec<_> = params.into_iter().filter(|(k, _)| k != FEED_FLAG).collect();
        let id = id.to_owned();
        Ok(if is_feed {
            Self::Feed { id, params }
        } else {
            Self::Detail { id, params }
        })
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Detail { id, .. } | Self::Feed { id, .. } => id,
        }
    }

    pub fn params(&self) -> &[(String, String)] {
        match self {
            Self::Detail { params, .. } | Self::Feed { params, .. } => params,
        }
    }

    pub const fn is_feed(&self) -> bool {
        matches!(self, Self::Feed { .. })
    }

    /// Cache key for cacheable variants.
    pub fn cache_key(&self) -> Option<String> {
        match self {
            Self::Feed { id, params } => Some(format!("feed:{id}:{}", normalize_params(params))),
            Self::Detail { .. } => None,
        }
    }

    fn url(&self, client: &UpstreamClient) -> Result<Url, EdgeError> {
        let mut url = client.base_api().join("manga/")?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| EdgeError::Data("api base cannot carry a path".into()))?;
            segments.pop_if_empty().push(self.id());
            if self.is_feed() {
                segments.push("feed");
            }
        }
        append_params(&mut url, self.params());
        Ok(url)
    }
}

fn append_params(url: &mut Url, params: &[(String, String)]) {
    if params.is_empty() {
        return;
    }
    url.query_pairs_mut()
        .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
}

/// `true` if a feed answer carries a `data` array worth caching.
pub fn has_feed_data(body: &[u8]) -> bool {
    net::parse_json(body)
        .map(|v| v.get("data").is_some_and(|d| !d.is_null()))
        .unwrap_or(false)
}

/// Fetches a manga document or feed as a validated JSON payload.
///
/// # Errors
///
/// Returns any error from the upstream client, or [`EdgeError::Json`] for a malformed body.
#[tracing::instrument(skip(client, retry_override), fields(id = request.id(), feed = request.is_feed()), err)]
pub async fn fetch_manga(
    client: &UpstreamClient,
    request: &MangaRequest,
    retry_override: Option<&RetryConfig>,
) -> Result<Payload, EdgeError> {
    let url = request.url(client)?;
    let resp = client.fetch_json(url, retry_override).await?;
    net::parse_json(&resp.body)?;
    Ok(Payload::json(resp.body))
}

/// Fetches the `/manga` search listing, forwarding every parameter in the caller's order.
///
/// # Errors
///
/// Returns any error from the upstream client, or [`EdgeError::Json`] for a malformed body.
#[tracing::instrument(skip(client, params, retry_override), err)]
pub async fn fetch_listing(
    client: &UpstreamClient,
    params: &[(String, String)],
    retry_override: Option<&RetryConfig>,
) -> Result<Payload, EdgeError> {
    let mut url = client.base_api().join("manga")?;
    append_params(&mut url, params);
    let resp = client.fetch_json(url, retry_override).await?;
    net::parse_json(&resp.body)?;
    Ok(Payload::json(resp.body))
}
