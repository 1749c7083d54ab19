// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod alerts;
pub mod analyze;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod ingest;
pub mod metrics;
pub mod notes;
pub mod report;
pub mod text;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing::info;

pub use crate::api::{create_router, AppState};
pub use crate::engine::Engine;
pub use crate::report::DailyReport;

use crate::config::{KeywordTables, ObserverConfig};
use crate::history::JsonFileHistoryStore;

/// Build the full application router from env/config files:
/// keyword tables, observer config, file-backed history, `/metrics`.
pub async fn app() -> anyhow::Result<Router> {
    let tables = KeywordTables::from_env().context("load keyword tables")?;
    let config = ObserverConfig::from_env().context("load observer config")?;

    let store = JsonFileHistoryStore::new(
        config.history.path.clone(),
        config.history.retain_days.max(1) as usize,
    );
    info!(
        target: "api",
        history = %store.path().display(),
        window = config.history.window,
        categories = tables.categories.len(),
        direction_keywords = tables.direction.len(),
        "observer configured"
    );

    let state = AppState {
        engine: Arc::new(Engine::new(Arc::new(tables), &config)),
        store: Arc::new(store),
        window: config.history.window,
        // no fetch client ships with the crate; callers that embed the
        // router add their own `ArticleSource`s
        sources: Vec::new(),
    };

    let metrics = crate::metrics::Metrics::global()?;
    Ok(create_router(state).merge(metrics.router()))
}
