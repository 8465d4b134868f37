use crate::common::{TestApp, TestOptions, routes};

#[tokio::test]
async fn requests_beyond_burst_are_rejected() {
    let app = TestApp::spawn_with(TestOptions {
        limiter: Some((0.5, 2)),
        ..Default::default()
    })
    .await;

    assert_eq!(app.get(routes::HEALTHCHECK).await.status, 200);
    assert_eq!(app.get(routes::HEALTHCHECK).await.status, 200);

    let limited = app.get(routes::HEALTHCHECK).await;
    assert_eq!(limited.status, 429);
    assert_eq!(limited.body["error"], "rate limit exceeded");
    assert!(limited.header("retry-after").is_some());
}

#[tokio::test]
async fn limiter_is_off_by_default() {
    let app = TestApp::spawn().await;

    for _ in 0..20 {
        assert_eq!(app.get(routes::HEALTHCHECK).await.status, 200);
    }
}
