use crate::{telemetry, API_VERSION};
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use vertexops_core::VertexCore;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Clone)]
struct HealthState {
    core: Arc<VertexCore>,
    metrics: PrometheusHandle,
}

pub fn routes(core: Arc<VertexCore>, metrics: PrometheusHandle) -> Router {
    Router::new()
        .route("/api", get(api_info))
        .route("/health", get(health_check))
        .route("/metrics", get(prometheus_metrics))
        .with_state(HealthState { core, metrics })
}

async fn api_info() -> Json<Value> {
    Json(json!({
        "message": "Welcome to VertexOps - LLMOps Platform (Local MVP)",
        "version": API_VERSION,
        "metrics": "/metrics",
        "features": [
            "Model Deployment & Fine-tuning",
            "RAG Query Processing",
            "Vector Search",
            "API Key Authentication",
            "Prometheus Metrics"
        ],
        "auth_note": "Include the 'x-api-key' header for authenticated endpoints",
        "status": "running"
    }))
}

async fn health_check(State(state): State<HealthState>) -> Json<Value> {
    debug!("Health check requested");

    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
        "services": {
            "vector_store": "active",
            "model_service": "active",
            "rag_service": "active"
        },
        "vector_count": state.core.vector_store.len()
    }))
}

async fn prometheus_metrics(State(state): State<HealthState>) -> impl IntoResponse {
    telemetry::set_vector_records(state.core.vector_store.len());

    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.render(),
    )
}
