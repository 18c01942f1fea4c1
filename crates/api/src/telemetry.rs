//! Prometheus exposition for request and store metrics.

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::warn;

pub const REQUESTS_TOTAL: &str = "vertexops_requests_total";
pub const REQUEST_LATENCY: &str = "vertexops_request_latency_seconds";
pub const VECTOR_RECORDS: &str = "vertexops_vector_records";

const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the process-wide recorder on first use and returns its handle.
pub fn handle() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new()
                .set_buckets_for_metric(Matcher::Full(REQUEST_LATENCY.to_string()), LATENCY_BUCKETS)
                .unwrap_or_else(|e| {
                    warn!("Invalid latency buckets, falling back to summaries: {}", e);
                    PrometheusBuilder::new()
                });

            builder.install_recorder().unwrap_or_else(|e| {
                // another recorder owns the global slot; keep a private one so
                // rendering still works
                warn!("Prometheus recorder not installed: {}", e);
                PrometheusBuilder::new().build_recorder().handle()
            })
        })
        .clone()
}

pub fn record_request(method: &str, endpoint: &str, status: u16, latency: Duration) {
    metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(REQUEST_LATENCY, "endpoint" => endpoint.to_string())
        .record(latency.as_secs_f64());
}

pub fn set_vector_records(count: usize) {
    metrics::gauge!(VECTOR_RECORDS).set(count as f64);
}
