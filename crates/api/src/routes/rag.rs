use crate::{auth::ApiKey, error::ApiResult, extract::JsonBody};
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use vertexops_core::{RagAnswer, VertexCore};

#[derive(Debug, Deserialize)]
pub struct RagQueryRequest {
    pub query: String,
    #[serde(default)]
    pub context_sources: Vec<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    5
}

pub fn routes(core: Arc<VertexCore>) -> Router {
    Router::new()
        .route("/rag/query", post(rag_query))
        .with_state(core)
}

async fn rag_query(
    State(core): State<Arc<VertexCore>>,
    _key: ApiKey,
    JsonBody(request): JsonBody<RagQueryRequest>,
) -> ApiResult<Json<RagAnswer>> {
    let answer = core
        .rag_service
        .generate_response(&request.query, request.top_k, &request.context_sources)
        .await?;

    Ok(Json(answer))
}
