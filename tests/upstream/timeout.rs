use std::time::{Duration, Instant};

use httpmock::Method::GET;
use manga_edge::EdgeError;
use url::Url;

use crate::common::{client_builder, setup_server};

#[tokio::test]
async fn slow_upstream_times_out_without_retry() {
    let server = setup_server();
    server.mock(|when, then| {
        when.method(GET).path("/slow");
        then.status(429).delay(Duration::from_secs(2));
    });
    let client = client_builder(&server)
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let started = Instant::now();
    let result = client
        .fetch_json(Url::parse(&server.url("/slow")).unwrap(), None)
        .await;

    assert!(matches!(result, Err(EdgeError::Timeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(2));
}
