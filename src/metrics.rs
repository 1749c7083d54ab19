use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

static GLOBAL: OnceCell<Metrics> = OnceCell::new();

impl Metrics {
    /// Install the process-wide Prometheus recorder (first call only) and
    /// return the shared handle.
    pub fn global() -> Result<&'static Metrics> {
        GLOBAL.get_or_try_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .context("prometheus: install recorder")?;
            Ok(Metrics { handle })
        })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
