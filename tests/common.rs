#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use httpmock::{Method::GET, Mock, MockServer};
use manga_edge::{AppState, Backoff, RetryConfig, UpstreamClient, proxy};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

pub fn setup_server() -> MockServer {
    MockServer::start()
}

/// Upstream client pointing both bases at the mock server.
pub fn client_for(server: &MockServer) -> UpstreamClient {
    client_builder(server).build().unwrap()
}

pub fn client_builder(server: &MockServer) -> manga_edge::UpstreamClientBuilder {
    UpstreamClient::builder()
        .base_api(Url::parse(&server.url("/")).unwrap())
        .base_uploads(Url::parse(&server.url("/uploads/")).unwrap())
        .retry_config(fast_retry(3))
}

/// 429 retry with a 1ms fixed backoff so tests do not sleep.
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        backoff: Backoff::Fixed(Duration::from_millis(1)),
        ..RetryConfig::default()
    }
}

/// Serves `state` on an ephemeral port and returns its base URL (no trailing slash).
pub async fn spawn_proxy(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(proxy::serve(listener, state, std::future::pending()));
    format!("http://{addr}")
}

pub fn http() -> reqwest::Client {
    reqwest::Client::new()
}

pub fn at_home_body(hash: &str, pages: &[&str]) -> String {
    serde_json::json!({
        "result": "ok",
        "baseUrl": "https://uploads.example.org",
        "chapter": {
            "hash": hash,
            "data": pages,
            "dataSaver": pages.iter().map(|p| format!("s-{p}")).collect::<Vec<_>>(),
        }
    })
    .to_string()
}

pub fn mock_at_home<'a>(server: &'a MockServer, chapter_id: &str, body: String) -> Mock<'a> {
    let path = format!("/at-home/server/{chapter_id}");
    server.mock(|when, then| {
        when.method(GET).path(path);
        then.status(200)
            .header("content-type", "application/json")
            .body(body);
    })
}

pub fn mock_listing<'a>(server: &'a MockServer, body: &str) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET).path("/manga");
        then.status(200)
            .header("content-type", "application/json")
            .body(body);
    })
}

pub fn mock_cover<'a>(server: &'a MockServer, manga_id: &str, file_name: &str) -> Mock<'a> {
    let path = format!("/uploads/covers/{manga_id}/{file_name}");
    server.mock(|when, then| {
        when.method(GET).path(path);
        then.status(200)
            .header("content-type", "image/png")
            .body(&b"\x89PNG fake"[..]);
    })
}

/// Asserts the three CORS headers every proxy response carries.
pub fn assert_cors(res: &reqwest::Response) {
    let h = res.headers();
    assert_eq!(h["access-control-allow-origin"], "*");
    assert_eq!(h["access-control-allow-methods"], "GET, OPTIONS");
    assert_eq!(h["access-control-allow-headers"], "Content-Type, Authorization");
}

/// Minimal HTTP upstream answering the n-th request with `statuses[n]` (the last one
/// repeats). Returns the base URL and a hit counter.
pub async fn scripted_upstream(statuses: Vec<u16>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let status = statuses.get(n).or(statuses.last()).copied().unwrap_or(200);
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(read) => buf.extend_from_slice(&chunk[..read]),
                }
            }
            let body = if status == 200 { r#"{"ok":true}"# } else { "" };
            let response = format!(
                "HTTP/1.1 {status} Scripted\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    (format!("http://{addr}"), hits)
}
