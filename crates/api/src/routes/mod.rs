pub mod dashboard;
pub mod health;
pub mod models;
pub mod rag;
pub mod vector;

use crate::error::ApiError;
use axum::{http::Uri, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use vertexops_core::VertexCore;

pub fn create_routes(core: Arc<VertexCore>, metrics: PrometheusHandle) -> Router {
    Router::new()
        // Public routes
        .merge(dashboard::routes(core.clone()))
        .merge(health::routes(core.clone(), metrics))
        // Routes guarded by the `ApiKey` extractor
        .merge(vector::routes(core.clone()))
        .merge(rag::routes(core.clone()))
        .merge(models::routes(core))
}

// Fallback handler for unmatched routes
pub async fn not_found_handler(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
