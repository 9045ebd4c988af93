use std::future::Future;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::http::header::CACHE_CONTROL;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::chapter::{fetch_at_home, parse_at_home};
use crate::core::{CacheMode, CacheState, EdgeError, Payload};
use crate::cover::{self, CoverRequest, fetch_cover};
use crate::manga::{MangaRequest, fetch_listing, fetch_manga, has_feed_data, normalize_params};
use crate::proxy::response::{ApiError, payload_response, with_cache_control};
use crate::proxy::{AppState, ClientKey, LimitPolicy};

/// Request `Cache-Control`: `no-store` neither reads nor writes the cache; `no-cache`
/// skips the read but still refreshes the entry.
fn cache_mode(headers: &HeaderMap) -> CacheMode {
    let directives = headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let has = |name: &str| {
        directives
            .split(',')
            .any(|d| d.trim().eq_ignore_ascii_case(name))
    };
    if has("no-store") {
        CacheMode::Bypass
    } else if has("no-cache") {
        CacheMode::Refresh
    } else {
        CacheMode::Use
    }
}

async fn enforce_limit(
    state: &AppState,
    client: &ClientKey,
    policy: LimitPolicy,
) -> Result<(), EdgeError> {
    if state.limiter.admit(&client.0) {
        return Ok(());
    }
    match policy {
        LimitPolicy::Reject => Err(EdgeError::LocalRateLimited {
            client: client.0.clone(),
        }),
        LimitPolicy::Delay(pause) => {
            tracing::debug!(client = %client.0, ?pause, "over local limit, delaying");
            tokio::time::sleep(pause).await;
            if state.limiter.admit(&client.0) {
                Ok(())
            } else {
                Err(EdgeError::LocalRateLimited {
                    client: client.0.clone(),
                })
            }
        }
    }
}

/// Cache-aside around `fetch`. No lock is held while `fetch` runs.
async fn through_cache<F, Fut>(
    state: &AppState,
    key: &str,
    mode: CacheMode,
    ttl: Duration,
    fetch: F,
    cacheable: impl FnOnce(&Payload) -> bool,
) -> Result<(Payload, CacheState), EdgeError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Payload, EdgeError>>,
{
    if mode.reads()
        && let Some(hit) = state.cache.get(key).await
    {
        tracing::debug!(key, "cache hit");
        return Ok((hit, CacheState::Hit));
    }

    let payload = fetch().await?;
    if mode.writes() && cacheable(&payload) {
        state.cache.set(key, payload.clone(), ttl).await;
    }
    tracing::debug!(key, "cache miss");
    Ok((payload, CacheState::Miss))
}

/* ---------------- /api/chapter/{id} ---------------- */

#[tracing::instrument(skip(state, client, headers), fields(client = %client.0))]
pub(crate) async fn chapter(
    State(state): State<AppState>,
    client: ClientKey,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    chapter_inner(&state, &client, &headers, &id)
        .await
        .unwrap_or_else(|e| ApiError::new("Failed to fetch chapter server", e).into_response())
}

async fn chapter_inner(
    state: &AppState,
    client: &ClientKey,
    headers: &HeaderMap,
    id: &str,
) -> Result<Response, EdgeError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(EdgeError::InvalidRequest("missing chapter id".into()));
    }
    enforce_limit(state, client, state.settings.json_limit).await?;

    let (payload, cache) = through_cache(
        state,
        &format!("chapter:{id}"),
        cache_mode(headers),
        state.settings.chapter_ttl,
        || fetch_at_home(&state.client, id, Some(&state.settings.json_retry)),
        |p| parse_at_home(id, &p.body).is_ok(),
    )
    .await?;
    Ok(payload_response(payload, Some(cache)))
}

/* ---------------- /api/manga/{id} ---------------- */

#[tracing::instrument(skip(state, client, headers, params), fields(client = %client.0))]
pub(crate) async fn manga_detail(
    State(state): State<AppState>,
    client: ClientKey,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    manga_detail_inner(&state, &client, &headers, &id, params)
        .await
        .unwrap_or_else(|e| ApiError::new("Failed to fetch manga details", e).into_response())
}

async fn manga_detail_inner(
    state: &AppState,
    client: &ClientKey,
    headers: &HeaderMap,
    id: &str,
    params: Vec<(String, String)>,
) -> Result<Response, EdgeError> {
    let request = MangaRequest::from_params(id, params)?;
    enforce_limit(state, client, state.settings.json_limit).await?;

    let fetch = || fetch_manga(&state.client, &request, Some(&state.settings.json_retry));
    match request.cache_key() {
        Some(key) => {
            let (payload, cache) = through_cache(
                state,
                &key,
                cache_mode(headers),
                state.settings.feed_ttl,
                fetch,
                |p| has_feed_data(&p.body),
            )
            .await?;
            Ok(payload_response(payload, Some(cache)))
        }
        None => Ok(payload_response(fetch().await?, None)),
    }
}

/* ---------------- /api/manga ---------------- */

#[tracing::instrument(skip(state, client, headers, params), fields(client = %client.0))]
pub(crate) async fn manga_listing(
    State(state): State<AppState>,
    client: ClientKey,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    manga_listing_inner(&state, &client, &headers, &params)
        .await
        .unwrap_or_else(|e| ApiError::new("Failed to fetch manga data", e).into_response())
}

async fn manga_listing_inner(
    state: &AppState,
    client: &ClientKey,
    headers: &HeaderMap,
    params: &[(String, String)],
) -> Result<Response, EdgeError> {
    enforce_limit(state, client, state.settings.json_limit).await?;

    let (payload, cache) = through_cache(
        state,
        &format!("listing:{}", normalize_params(params)),
        cache_mode(headers),
        state.settings.listing_ttl,
        || fetch_listing(&state.client, params, Some(&state.settings.json_retry)),
        |_| true,
    )
    .await?;
    Ok(payload_response(payload, Some(cache)))
}

/* ---------------- /api/cover ---------------- */

#[derive(Debug, Deserialize)]
pub(crate) struct CoverParams {
    #[serde(rename = "mangaId")]
    manga_id: Option<String>,
    #[serde(rename = "fileName")]
    file_name: Option<String>,
}

#[tracing::instrument(skip(state, client, headers), fields(client = %client.0))]
pub(crate) async fn cover(
    State(state): State<AppState>,
    client: ClientKey,
    headers: HeaderMap,
    Query(params): Query<CoverParams>,
) -> Response {
    match cover_inner(&state, &client, &headers, &params).await {
        Ok(res) => with_cache_control(res, cover::CACHE_CONTROL),
        Err(e) => with_cache_control(
            ApiError::new("Failed to fetch cover image", e).into_response(),
            "no-cache",
        ),
    }
}

async fn cover_inner(
    state: &AppState,
    client: &ClientKey,
    headers: &HeaderMap,
    params: &CoverParams,
) -> Result<Response, EdgeError> {
    let request = CoverRequest::new(params.manga_id.as_deref(), params.file_name.as_deref())?;
    enforce_limit(state, client, state.settings.cover_limit).await?;

    // Covers use the client's default policy, which retries upstream 429s.
    let (payload, cache) = through_cache(
        state,
        &request.cache_key(),
        cache_mode(headers),
        state.settings.cover_ttl,
        || fetch_cover(&state.client, &request, None),
        |_| true,
    )
    .await?;
    Ok(payload_response(payload, Some(cache)))
}
