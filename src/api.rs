//! HTTP surface for the dashboard.
//!
//! - `GET  /health`
//! - `POST /report`         `{ date?, articles, collect?, dry_run? }` → `DailyReport`
//! - `GET  /history`        trailing window of daily summaries
//! - `GET  /history/{date}` one stored summary

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::aggregate::DailySummary;
use crate::engine::Engine;
use crate::history::{HistoryStore, HistoryWindow};
use crate::ingest::collect_from_sources;
use crate::ingest::types::{ArticleSource, RawArticle};
use crate::report::DailyReport;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub store: Arc<dyn HistoryStore>,
    /// Trailing window length handed to the engine.
    pub window: usize,
    /// Fetch clients polled when a request sets `collect`.
    pub sources: Vec<Arc<dyn ArticleSource>>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/report", post(report))
        .route("/history", get(history))
        .route("/history/{date}", get(history_day))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ReportReq {
    /// Defaults to today (UTC).
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    articles: Vec<RawArticle>,
    /// Also pull from the configured sources.
    #[serde(default)]
    collect: bool,
    /// Build the report without storing the summary.
    #[serde(default)]
    dry_run: bool,
}

type ApiError = (StatusCode, String);

fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!(target: "api", error = ?e, "history store failure");
    (StatusCode::INTERNAL_SERVER_ERROR, format!("history store: {e:#}"))
}

async fn report(State(state): State<AppState>, Json(req): Json<ReportReq>) -> Json<DailyReport> {
    let date = req.date.unwrap_or_else(|| Utc::now().date_naive());

    // days strictly before `date`, so backfills and re-runs see their own past
    let history = match state.store.window_before(date, state.window).await {
        Ok(w) => w,
        Err(e) => {
            tracing::warn!(target: "api", error = ?e, "history unavailable, running without it");
            HistoryWindow::with_capacity(state.window)
        }
    };

    let mut articles = req.articles;
    if req.collect {
        articles.extend(collect_from_sources(&state.sources).await);
    }

    let report = state.engine.run(date, articles, &history);

    if !req.dry_run {
        if let Err(e) = state.store.append(report.summary.clone()).await {
            tracing::warn!(target: "api", error = ?e, %date, "failed to store summary");
        }
    }
    Json(report)
}

async fn history(State(state): State<AppState>) -> Result<Json<Vec<DailySummary>>, ApiError> {
    let w = state.store.window(state.window).await.map_err(internal)?;
    Ok(Json(w.to_vec()))
}

async fn history_day(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<DailySummary>, ApiError> {
    match state.store.get(date).await.map_err(internal)? {
        Some(s) => Ok(Json(s)),
        None => Err((StatusCode::NOT_FOUND, format!("no summary stored for {date}"))),
    }
}
