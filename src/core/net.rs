use reqwest::header::CONTENT_TYPE;

use crate::core::{EdgeError, UpstreamResponse};

/// Read status, content type and the full body of an upstream response.
pub(crate) async fn read_response(resp: reqwest::Response) -> Result<UpstreamResponse, reqwest::Error> {
    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = resp.bytes().await?;

    Ok(UpstreamResponse {
        status,
        content_type,
        body,
    })
}

/// Parse a body as JSON, rejecting malformed upstream payloads before they are cached.
pub(crate) fn parse_json(body: &[u8]) -> Result<serde_json::Value, EdgeError> {
    serde_json::from_slice(body).map_err(EdgeError::Json)
}
