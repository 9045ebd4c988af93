use httpmock::Method::GET;
use manga_edge::AppState;

use crate::common::{assert_cors, client_for, http, setup_server, spawn_proxy};

#[tokio::test]
async fn cover_without_file_name_is_rejected_before_upstream() {
    let server = setup_server();
    let upstream = server.mock(|when, then| {
        when.method(GET);
        then.status(200);
    });
    let base = spawn_proxy(AppState::new(client_for(&server))).await;

    let res = http()
        .get(format!("{base}/api/cover?mangaId=m1"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    assert_cors(&res);
    assert_eq!(res.headers()["cache-control"], "no-cache");
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Missing mangaId or fileName parameter");
    upstream.assert_calls(0);
}

#[tokio::test]
async fn blank_cover_parameters_count_as_missing() {
    let server = setup_server();
    let base = spawn_proxy(AppState::new(client_for(&server))).await;

    let res = http()
        .get(format!("{base}/api/cover?mangaId=%20&fileName=a.jpg"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn unknown_routes_are_404_with_cors() {
    let server = setup_server();
    let base = spawn_proxy(AppState::new(client_for(&server))).await;

    let res = http().get(format!("{base}/api/nope")).send().await.unwrap();

    assert_eq!(res.status(), 404);
    assert_cors(&res);
}
