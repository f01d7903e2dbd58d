use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder. Fails if one is already
    /// installed; call once from the binary.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("listing_analyses_total", "Listings analyzed, by final verdict");
        describe_counter!(
            "signal_fallbacks_total",
            "Provider failures or timeouts replaced by the neutral signal"
        );
        describe_counter!("benchmark_misses_total", "Price checks without a benchmark entry");
        describe_histogram!("listing_risk_score", "Final risk score per listing");
        describe_histogram!("listing_analysis_ms", "Wall time of one listing analysis");

        Ok(Self { handle })
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
