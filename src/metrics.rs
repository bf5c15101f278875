use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once, from the binary.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        describe();
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

/// Descriptions so every series shows up on /metrics from the first scrape.
pub fn describe() {
    describe_counter!("pipeline_runs_total", "Pipeline runs started, by trigger.");
    describe_counter!("ingest_items_total", "Items discovered, by source kind.");
    describe_counter!(
        "ingest_source_errors_total",
        "Sources that failed and contributed zero items."
    );
    describe_counter!("dedup_duplicates_total", "Items collapsed by deduplication.");
    describe_counter!("format_success_total", "Items formatted into posts.");
    describe_counter!(
        "format_failures_total",
        "Items dropped by the formatter, by reason."
    );
    describe_histogram!("ingest_parse_ms", "Source parse time in milliseconds.");
    describe_histogram!("pipeline_run_ms", "Whole-run wall time in milliseconds.");
    describe_gauge!("pipeline_last_run_ts", "Unix ts when a run last finished.");
}
