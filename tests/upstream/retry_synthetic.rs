use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use httpmock::Method::GET;
use manga_edge::{Backoff, EdgeError, RetryConfig, UpstreamClient};
use url::Url;

use crate::common::{client_builder, fast_retry, scripted_upstream, setup_server};

#[tokio::test]
async fn persistent_429_is_retried_up_to_the_attempt_ceiling() {
    let server = setup_server();
    let fail_mock = server.mock(|when, then| {
        when.method(GET).path("/throttled");
        then.status(429).body("Too Many Requests");
    });

    let max_attempts = 4;
    let client = client_builder(&server)
        .retry_config(fast_retry(max_attempts))
        .build()
        .unwrap();

    let result = client
        .fetch_json(Url::parse(&server.url("/throttled")).unwrap(), None)
        .await;

    // every allowed attempt hit the upstream, none more
    fail_mock.assert_calls(max_attempts as usize);
    match result {
        Err(EdgeError::Exhausted { attempts, .. }) => assert_eq!(attempts, max_attempts),
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn disabled_override_sends_a_single_attempt() {
    let server = setup_server();
    let fail_mock = server.mock(|when, then| {
        when.method(GET).path("/throttled");
        then.status(429);
    });
    let client = client_builder(&server).build().unwrap();

    let result = client
        .fetch_json(
            Url::parse(&server.url("/throttled")).unwrap(),
            Some(&RetryConfig::disabled()),
        )
        .await;

    fail_mock.assert_calls(1);
    assert!(matches!(result, Err(EdgeError::RateLimited { .. })));
}

#[tokio::test]
async fn other_error_statuses_are_not_retried() {
    let server = setup_server();
    let unavailable = server.mock(|when, then| {
        when.method(GET).path("/unavailable");
        then.status(503).body("Service Unavailable");
    });
    let missing = server.mock(|when, then| {
        when.method(GET).path("/missing");
        then.status(404);
    });
    let client = client_builder(&server).build().unwrap();

    for (path, expected) in [("/unavailable", 503), ("/missing", 404)] {
        match client.fetch_json(Url::parse(&server.url(path)).unwrap(), None).await {
            Err(EdgeError::Status { status, .. }) => assert_eq!(status, expected),
            other => panic!("expected Status error for {path}, got {other:?}"),
        }
    }

    unavailable.assert_calls(1);
    missing.assert_calls(1);
}

#[tokio::test]
async fn throttling_then_success_returns_ok_within_one_call() {
    let (base, hits) = scripted_upstream(vec![429, 200]).await;
    let client = UpstreamClient::builder()
        .retry_config(RetryConfig {
            max_attempts: 3,
            backoff: Backoff::Fixed(Duration::from_millis(150)),
            ..RetryConfig::default()
        })
        .build()
        .unwrap();

    let started = Instant::now();
    let resp = client
        .fetch_json(Url::parse(&format!("{base}/flaky")).unwrap(), None)
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(&resp.body[..], br#"{"ok":true}"#);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn throttling_outside_the_retry_list_is_not_reported_as_exhausted() {
    let server = setup_server();
    let throttled = server.mock(|when, then| {
        when.method(GET).path("/throttled");
        then.status(429);
    });
    let mut cfg = fast_retry(3);
    cfg.retry_on_status = vec![503];
    let client = client_builder(&server).retry_config(cfg).build().unwrap();

    let result = client
        .fetch_json(Url::parse(&server.url("/throttled")).unwrap(), None)
        .await;

    throttled.assert_calls(1);
    assert!(matches!(result, Err(EdgeError::RateLimited { .. })));
}
