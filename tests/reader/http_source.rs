use std::sync::Arc;
use std::time::Duration;

use httpmock::{Method::GET, Mock, MockServer};
use manga_edge::reader::ChapterSource;
use manga_edge::{
    AppState, Backoff, HttpChapterSource, ReaderSequencer, ReaderState, SequencerConfig,
};
use url::Url;

use crate::common::{client_for, mock_at_home, setup_server, spawn_proxy};

fn at_home_on(server: &MockServer, hash: &str, pages: &[&str]) -> String {
    serde_json::json!({
        "result": "ok",
        "baseUrl": server.url("/node"),
        "chapter": { "hash": hash, "data": pages, "dataSaver": [] }
    })
    .to_string()
}

fn mock_page<'a>(server: &'a MockServer, hash: &str, file: &str) -> Mock<'a> {
    let path = format!("/node/data/{hash}/{file}");
    server.mock(|when, then| {
        when.method(GET).path(path);
        then.status(200).header("content-type", "image/png").body("page");
    })
}

async fn source_for(server: &MockServer) -> Arc<HttpChapterSource> {
    let base = spawn_proxy(AppState::new(client_for(server))).await;
    let source = HttpChapterSource::new(Url::parse(&format!("{base}/")).unwrap()).unwrap();
    Arc::new(source)
}

fn fast_config() -> SequencerConfig {
    let mut config = SequencerConfig::default();
    config.resolve_retry.backoff = Backoff::Fixed(Duration::from_millis(10));
    config
}

#[tokio::test]
async fn reads_through_the_proxy_and_prefetches_the_next_chapter() {
    let server = setup_server();
    let c1 = mock_at_home(&server, "c1", at_home_on(&server, "h1", &["1.png", "2.png"]));
    let c2 = mock_at_home(
        &server,
        "c2",
        at_home_on(&server, "h2", &["1.png", "2.png", "3.png", "4.png"]),
    );
    let leading: Vec<_> = ["1.png", "2.png", "3.png"]
        .iter()
        .map(|f| mock_page(&server, "h2", f))
        .collect();
    let fourth = mock_page(&server, "h2", "4.png");

    let source = source_for(&server).await;
    let mut reader = ReaderSequencer::with_config(Arc::clone(&source), fast_config());
    reader.set_chapters(["c1", "c2"]);

    let state = reader.open("c1").await;
    assert_eq!(
        state.pages(),
        [server.url("/node/data/h1/1.png"), server.url("/node/data/h1/2.png")]
    );

    let prefetched = reader.wait_prefetch().await.unwrap().unwrap();
    assert_eq!(prefetched.chapter.hash, "h2");
    assert_eq!(prefetched.pages_fetched, 3);
    for page in &leading {
        page.assert_calls(1);
    }
    fourth.assert_calls(0);

    // the session cache answers the second resolution
    let state = reader.advance().await.unwrap();
    assert!(state.is_ready());
    assert_eq!(state.chapter_id(), Some("c2"));
    c1.assert_calls(1);
    c2.assert_calls(1);
}

#[tokio::test]
async fn missing_chapter_fails_at_once_with_fallback_link() {
    let server = setup_server();
    let missing = server.mock(|when, then| {
        when.method(GET).path("/at-home/server/gone");
        then.status(404).body(r#"{"result":"error"}"#);
    });
    let source = source_for(&server).await;
    let mut reader = ReaderSequencer::with_config(source, fast_config());

    let state = reader.open("gone").await;

    match state {
        ReaderState::Failed { fallback_url, .. } => {
            assert_eq!(fallback_url, "https://mangadex.org/chapter/gone");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    missing.assert_calls(1);
}

#[tokio::test]
async fn throttled_resolution_is_retried_then_abandoned() {
    let server = setup_server();
    let throttled = server.mock(|when, then| {
        when.method(GET).path("/at-home/server/busy");
        then.status(429);
    });
    let source = source_for(&server).await;
    let mut reader = ReaderSequencer::with_config(source, fast_config());

    let state = reader.open("busy").await;

    assert_eq!(state.fallback_url(), Some("https://mangadex.org/chapter/busy"));
    throttled.assert_calls(3);
}

#[tokio::test]
async fn pages_are_fetched_once_per_session() {
    let server = setup_server();
    let page = mock_page(&server, "h9", "1.png");
    let source = source_for(&server).await;
    let url = server.url("/node/data/h9/1.png");

    let first = source.fetch_page(&url).await.unwrap();
    let second = source.fetch_page(&url).await.unwrap();
    assert_eq!(first, second);
    page.assert_calls(1);

    source.clear_cache().await;
    source.fetch_page(&url).await.unwrap();
    page.assert_calls(2);
}

#[tokio::test]
async fn zero_page_ttl_disables_the_session_page_cache() {
    let server = setup_server();
    let page = mock_page(&server, "h8", "1.png");
    let base = spawn_proxy(AppState::new(client_for(&server))).await;
    let source = HttpChapterSource::new(Url::parse(&format!("{base}/")).unwrap())
        .unwrap()
        .cache_ttls(Duration::from_secs(600), Duration::ZERO);
    let url = server.url("/node/data/h8/1.png");

    source.fetch_page(&url).await.unwrap();
    source.fetch_page(&url).await.unwrap();

    page.assert_calls(2);
}
