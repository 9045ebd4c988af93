use url::Url;

use crate::chapter::{model::ChapterResource, wire::AtHomeEnvelope};
use crate::core::{EdgeError, Payload, RetryConfig, UpstreamClient, net};

pub(crate) fn at_home_url(client: &UpstreamClient, chapter_id: &str) -> Result<Url, EdgeError> {
    let mut url = client.base_api().join("at-home/server/")?;
    url.path_segments_mut()
        .map_err(|()| EdgeError::Data("api base cannot carry a path".into()))?
        .pop_if_empty()
        .push(chapter_id);
    Ok(url)
}

/// Fetches the at-home server descriptor for a chapter as a validated JSON payload.
///
/// # Errors
///
/// Returns [`EdgeError::InvalidRequest`] for a blank id (no upstream call is made),
/// [`EdgeError::Json`] for a malformed body, or any error from the upstream client.
#[tracing::instrument(skip(client, retry_override), err)]
pub async fn fetch_at_home(
    client: &UpstreamClient,
    chapter_id: &str,
    retry_override: Option<&RetryConfig>,
) -> Result<Payload, EdgeError> {
    let chapter_id = chapter_id.trim();
    if chapter_id.is_empty() {
        return Err(EdgeError::InvalidRequest("missing chapter id".into()));
    }

    let url = at_home_url(client, chapter_id)?;
    let resp = client.fetch_json(url, retry_override).await?;
    net::parse_json(&resp.body)?;
    Ok(Payload::json(resp.body))
}

/// Decodes an at-home descriptor into a [`ChapterResource`].
///
/// # Errors
///
/// Returns [`EdgeError::Data`] when the base URL, chapter block or hash is missing,
/// or [`EdgeError::Json`] if the body is not valid JSON.
pub fn parse_at_home(chapter_id: &str, body: &[u8]) -> Result<ChapterResource, EdgeError> {
    let env: AtHomeEnvelope = serde_json::from_slice(body)?;

    let base_url = env
        .base_url
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EdgeError::Data("missing baseUrl".into()))?;
    let chapter = env
        .chapter
        .ok_or_else(|| EdgeError::Data("missing chapter".into()))?;
    let hash = chapter
        .hash
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EdgeError::Data("missing chapter hash".into()))?;

    Ok(ChapterResource {
        chapter_id: chapter_id.to_owned(),
        base_url,
        hash,
        data: chapter.data,
        data_saver: chapter.data_saver,
    })
}
