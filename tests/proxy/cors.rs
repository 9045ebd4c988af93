use std::time::Duration;

use httpmock::Method::GET;
use manga_edge::AppState;
use reqwest::Method;

use crate::common::{assert_cors, client_builder, client_for, http, mock_listing, setup_server, spawn_proxy};

#[tokio::test]
async fn preflight_answers_200_with_empty_body() {
    let server = setup_server();
    let base = spawn_proxy(AppState::new(client_for(&server))).await;

    for path in ["/api/manga", "/api/manga/m1", "/api/chapter/c1", "/api/cover"] {
        let res = http()
            .request(Method::OPTIONS, format!("{base}{path}"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200, "{path}");
        assert_cors(&res);
        assert!(res.bytes().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn cors_headers_on_success_and_every_failure_kind() {
    let server = setup_server();
    mock_listing(&server, r#"{"data":[]}"#);
    server.mock(|when, then| {
        when.method(GET).path("/manga/missing");
        then.status(404).body(r#"{"result":"error"}"#);
    });
    server.mock(|when, then| {
        when.method(GET).path("/manga/slow");
        then.status(200).delay(Duration::from_millis(500)).body("{}");
    });
    let client = client_builder(&server)
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let base = spawn_proxy(AppState::new(client)).await;

    let cases = [
        ("/api/manga", 200),
        ("/api/manga/missing", 404),
        ("/api/manga/slow", 504),
        ("/api/cover", 400),
    ];
    for (path, status) in cases {
        let res = http().get(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(res.status(), status, "{path}");
        assert_cors(&res);
    }
}
