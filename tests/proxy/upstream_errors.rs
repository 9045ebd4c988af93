use std::time::Duration;

use httpmock::Method::GET;
use manga_edge::AppState;

use crate::common::{client_builder, client_for, http, setup_server, spawn_proxy};

#[tokio::test]
async fn upstream_429_is_passed_through_without_retry_on_json_routes() {
    let server = setup_server();
    let upstream = server.mock(|when, then| {
        when.method(GET).path("/at-home/server/c1");
        then.status(429).body("slow down");
    });
    let base = spawn_proxy(AppState::new(client_for(&server))).await;

    let res = http().get(format!("{base}/api/chapter/c1")).send().await.unwrap();

    assert_eq!(res.status(), 429);
    assert_eq!(res.headers()["retry-after"], "1");
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Upstream API is rate limiting requests");
    upstream.assert_calls(1);
}

#[tokio::test]
async fn upstream_status_is_passed_through() {
    let server = setup_server();
    let upstream = server.mock(|when, then| {
        when.method(GET).path("/manga/gone");
        then.status(404).body(r#"{"result":"error"}"#);
    });
    let base = spawn_proxy(AppState::new(client_for(&server))).await;

    let res = http().get(format!("{base}/api/manga/gone")).send().await.unwrap();

    assert_eq!(res.status(), 404);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Upstream API returned 404");
    upstream.assert_calls(1);
}

#[tokio::test]
async fn slow_upstream_maps_to_504() {
    let server = setup_server();
    server.mock(|when, then| {
        when.method(GET).path("/manga");
        then.status(200).delay(Duration::from_secs(2)).body("{}");
    });
    let client = client_builder(&server)
        .timeout(Duration::from_millis(150))
        .build()
        .unwrap();
    let base = spawn_proxy(AppState::new(client)).await;

    let res = http().get(format!("{base}/api/manga")).send().await.unwrap();

    assert_eq!(res.status(), 504);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Request timeout");
}

#[tokio::test]
async fn malformed_json_is_a_500_and_not_cached() {
    let server = setup_server();
    let upstream = server.mock(|when, then| {
        when.method(GET).path("/manga");
        then.status(200).body("<html>maintenance</html>");
    });
    let base = spawn_proxy(AppState::new(client_for(&server))).await;

    for _ in 0..2 {
        let res = http().get(format!("{base}/api/manga")).send().await.unwrap();
        assert_eq!(res.status(), 500);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Failed to fetch manga data");
        assert!(body["details"].is_string());
    }
    upstream.assert_calls(2);
}
