// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use market_observer::config::{KeywordTables, ObserverConfig};
use market_observer::history::{HistoryStore, MemoryHistoryStore};
use market_observer::ingest::types::{ArticleSource, RawArticle};
use market_observer::{create_router, AppState, Engine};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_app() -> (Router, Arc<MemoryHistoryStore>) {
    app_with_sources(Vec::new())
}

fn app_with_sources(sources: Vec<Arc<dyn ArticleSource>>) -> (Router, Arc<MemoryHistoryStore>) {
    let tables = Arc::new(KeywordTables::builtin().expect("builtin tables"));
    let store = Arc::new(MemoryHistoryStore::new(30));
    let state = AppState {
        engine: Arc::new(Engine::new(tables, &ObserverConfig::default())),
        store: store.clone(),
        window: 7,
        sources,
    };
    (create_router(state), store)
}

struct Wire;

#[async_trait::async_trait]
impl ArticleSource for Wire {
    async fn fetch_today(&self) -> anyhow::Result<Vec<RawArticle>> {
        Ok(vec![RawArticle {
            title: "Market crash deepens global crisis".into(),
            source: "wire".into(),
            published_at: Some("2025-03-10T04:00:00Z".into()),
            ..Default::default()
        }])
    }
    fn name(&self) -> &'static str {
        "wire"
    }
}

async fn body_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn post_report(payload: Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/report")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /report")
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "OK");
}

#[tokio::test]
async fn report_returns_contract_fields_and_stores_summary() {
    let (app, store) = test_app();
    let payload = json!({
        "date": "2025-03-10",
        "articles": [
            { "title": "Central bank signals rate cut amid slowing growth",
              "source": "Reuters", "published_at": "2025-03-10T01:00:00Z" },
            { "title": "Local bakery opens second branch",
              "source": "wire", "published_at": "2025-03-10T02:00:00Z" },
            { "title": "", "body": "", "published_at": "2025-03-10T03:00:00Z" }
        ]
    });

    let resp = app.oneshot(post_report(payload)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = body_json(resp).await;

    assert_eq!(v["date"], "2025-03-10");
    assert_eq!(v["summary"]["news_count"], 2);
    assert_eq!(v["summary"]["zero_ratio"], 50.0);
    assert_eq!(v["has_priority"], true);
    assert_eq!(v["priority_topics"]["central-bank"]["present"], true);
    assert_eq!(v["news"]["positive"][0]["impact_score"], 6);
    assert_eq!(
        v["news"]["positive"][0]["classification"]["category"],
        "monetary-policy"
    );
    assert_eq!(v["news"]["neutral"][0]["score_reason"]["kind"], "withheld");
    assert_eq!(v["withheld"]["no-keyword-match"], 1);
    assert_eq!(v["intake"]["rejected"], 1);
    assert_eq!(v["intake"]["rejections"][0]["error"]["kind"], "missing_text");
    assert!(v["one_liner"].as_str().is_some());
    assert_eq!(v["outlook"].as_array().map(Vec::len), Some(2));
    assert_eq!(v["market_remarks"].as_array().map(Vec::len), Some(0));
    assert_eq!(v["priority_topics"]["central-bank"]["label"], "Central bank policy");

    let date = chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let stored = store.get(date).await.unwrap().expect("summary stored");
    assert_eq!(stored.news_count, 2);
}

#[tokio::test]
async fn dry_run_does_not_store() {
    let (app, store) = test_app();
    let payload = json!({ "date": "2025-03-11", "articles": [], "dry_run": true });
    let resp = app.oneshot(post_report(payload)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = body_json(resp).await;
    assert_eq!(v["summary"]["news_count"], 0);
    assert_eq!(v["summary"]["no_data"].as_array().map(Vec::len), Some(3));
    assert!(store.window(7).await.unwrap().is_empty());
}

#[tokio::test]
async fn second_day_sees_first_day_in_history() {
    let (app, _) = test_app();
    let day1 = json!({
        "date": "2025-03-10",
        "articles": [{ "title": "Market crash deepens global crisis",
                       "published_at": "2025-03-10T01:00:00Z" }]
    });
    let day2 = json!({
        "date": "2025-03-11",
        "articles": [{ "title": "Central bank signals rate cut amid slowing growth",
                       "published_at": "2025-03-11T01:00:00Z" }]
    });
    let r1 = app.clone().oneshot(post_report(day1)).await.unwrap();
    assert_eq!(r1.status(), StatusCode::OK);

    let v = body_json(app.clone().oneshot(post_report(day2)).await.unwrap()).await;
    let kinds: Vec<&str> = v["alerts"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"score-swing"), "alerts: {kinds:?}");
    assert_eq!(v["comparison"]["days"], 1);

    let resp = app
        .clone()
        .oneshot(Request::get("/history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let h = body_json(resp).await;
    assert_eq!(h.as_array().map(Vec::len), Some(2));
    assert_eq!(h[0]["date"], "2025-03-10");
}

#[tokio::test]
async fn history_day_404_when_missing() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(Request::get("/history/2025-01-01").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

fn stored_day(d: u32, total: f64) -> market_observer::aggregate::DailySummary {
    let mut s = market_observer::aggregate::DailySummary::empty(
        chrono::NaiveDate::from_ymd_opt(2025, 3, d).unwrap(),
    );
    s.total_score = total;
    s.news_count = 1;
    s.no_data.clear();
    s
}

#[tokio::test]
async fn backfill_uses_days_before_the_requested_date() {
    let (app, store) = test_app();
    for (d, total) in [(1, 2.0), (2, 2.0), (3, 2.0), (4, -9.0)] {
        store.append(stored_day(d, total)).await.unwrap();
    }
    // a full week stored after the backfilled day
    for d in 6..=12 {
        store.append(stored_day(d, 0.0)).await.unwrap();
    }

    let payload = json!({
        "date": "2025-03-05",
        "articles": [{ "title": "Central bank signals rate cut amid slowing growth",
                       "published_at": "2025-03-05T01:00:00Z" }],
        "dry_run": true
    });
    let v = body_json(app.oneshot(post_report(payload)).await.unwrap()).await;

    let kinds: Vec<&str> = v["alerts"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"score-swing"), "alerts: {kinds:?}");
    assert!(kinds.contains(&"moving-average-reversal"), "alerts: {kinds:?}");
    assert_eq!(v["comparison"]["days"], 4);
}

#[tokio::test]
async fn collect_pulls_from_configured_sources() {
    let (app, _) = app_with_sources(vec![Arc::new(Wire)]);
    let payload = json!({
        "date": "2025-03-10",
        "articles": [{ "title": "Central bank signals rate cut amid slowing growth",
                       "published_at": "2025-03-10T01:00:00Z" }],
        "collect": true,
        "dry_run": true
    });
    let v = body_json(app.clone().oneshot(post_report(payload)).await.unwrap()).await;
    assert_eq!(v["intake"]["received"], 2);
    assert_eq!(v["news"]["negative"].as_array().map(Vec::len), Some(1));

    // without the flag the sources are left alone
    let payload = json!({ "date": "2025-03-10", "articles": [], "dry_run": true });
    let v = body_json(app.oneshot(post_report(payload)).await.unwrap()).await;
    assert_eq!(v["intake"]["received"], 0);
}
