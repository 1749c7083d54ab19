// tests/metrics.rs
//
// Full in-process app (env-configured) exposes Prometheus series after a run.

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[serial_test::serial]
#[tokio::test]
async fn metrics_endpoint_contains_expected_series() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("observer.toml");
    let history = dir.path().join("history.json");
    std::fs::write(
        &cfg,
        format!("[history]\npath = {:?}\n", history.display().to_string()),
    )
    .unwrap();
    std::env::set_var("OBSERVER_CONFIG_PATH", cfg.display().to_string());
    std::env::remove_var("OBSERVER_KEYWORDS_PATH");

    let app = market_observer::app()
        .await
        .expect("app() should build Router in tests");
    std::env::remove_var("OBSERVER_CONFIG_PATH");

    let payload = json!({
        "date": "2025-03-10",
        "articles": [
            { "title": "Market crash deepens global crisis", "published_at": "2025-03-10T01:00:00Z" },
            { "title": "no timestamp here" }
        ]
    });
    let resp = app
        .clone()
        .oneshot(
            Request::post("/report")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(history.exists(), "summary should be written to the configured path");

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "observer_articles_received_total",
        "observer_articles_rejected_total",
        "observer_last_total_score",
        "observer_last_run_ts",
    ] {
        assert!(text.contains(needle), "missing series {needle} in:\n{text}");
    }
}
