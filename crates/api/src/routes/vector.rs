use crate::{
    auth::ApiKey,
    error::{validation_error, ApiResult},
    extract::JsonBody,
    telemetry,
};
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use vertexops_common::Metadata;
use vertexops_core::VertexCore;
use vertexops_knowledge::NewRecord;

const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl AddRequest {
    fn into_record(self) -> ApiResult<NewRecord> {
        if self.text.trim().is_empty() {
            return Err(validation_error("text must not be empty"));
        }
        Ok(NewRecord {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            text: self.text,
            metadata: self.metadata,
            embedding: self.embedding,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkAddRequest {
    pub items: Vec<AddRequest>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

pub fn routes(core: Arc<VertexCore>) -> Router {
    Router::new()
        .route("/vector/add", post(add_vector))
        .route("/vector/bulk_add", post(bulk_add_vectors))
        .route("/vector/search", post(search_vectors))
        .with_state(core)
}

async fn add_vector(
    State(core): State<Arc<VertexCore>>,
    _key: ApiKey,
    JsonBody(request): JsonBody<AddRequest>,
) -> ApiResult<Json<Value>> {
    let record = core.vector_store.add_record(request.into_record()?)?;
    telemetry::set_vector_records(core.vector_store.len());

    Ok(Json(json!({
        "status": "ok",
        "record": record
    })))
}

async fn bulk_add_vectors(
    State(core): State<Arc<VertexCore>>,
    _key: ApiKey,
    JsonBody(request): JsonBody<BulkAddRequest>,
) -> ApiResult<Json<Value>> {
    let items = request
        .items
        .into_iter()
        .map(AddRequest::into_record)
        .collect::<ApiResult<Vec<_>>>()?;

    let records = core.vector_store.bulk_add(items)?;
    telemetry::set_vector_records(core.vector_store.len());
    info!("Bulk added {} vector records", records.len());

    Ok(Json(json!({
        "status": "ok",
        "added": records.len(),
        "records": records
    })))
}

async fn search_vectors(
    State(core): State<Arc<VertexCore>>,
    _key: ApiKey,
    JsonBody(request): JsonBody<SearchRequest>,
) -> ApiResult<Json<Value>> {
    let text = request.text.filter(|text| !text.trim().is_empty());
    let query = match (request.embedding, text) {
        (Some(embedding), _) => embedding,
        (None, Some(text)) => core.vector_store.embed(&text),
        (None, None) => return Err(validation_error("Provide embedding or text")),
    };

    let results = core.vector_store.search(&query, request.top_k)?;

    Ok(Json(json!({ "results": results })))
}

#[cfg(test)]
mod tests {
    use crate::{routes::test_support::*, ApiConfig};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::json;

    #[tokio::test]
    async fn test_add_assigns_id_and_embeds() {
        let (app, core) = test_app().await;
        let (status, body) = send(
            &app,
            post_json("/vector/add", json!({ "text": "hello world", "metadata": { "src": "t" } })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        let id = body["record"]["id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert_eq!(body["record"]["embedding"].as_array().unwrap().len(), 128);
        assert_eq!(body["record"]["metadata"]["src"], "t");
        assert_eq!(core.vector_store.len(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_blank_text() {
        let (app, core) = test_app().await;
        let (status, body) = send(&app, post_json("/vector/add", json!({ "text": "   " }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
        assert!(core.vector_store.is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_wrong_dimension() {
        let (app, _core) = test_app().await;
        let (status, body) = send(
            &app,
            post_json("/vector/add", json!({ "id": "x", "text": "t", "embedding": [0.1, 0.2] })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "DIMENSION_MISMATCH");
    }

    #[tokio::test]
    async fn test_bulk_add_is_all_or_nothing() {
        let (app, core) = test_app().await;
        let (status, _) = send(
            &app,
            post_json(
                "/vector/bulk_add",
                json!({ "items": [
                    { "id": "a", "text": "first" },
                    { "id": "b", "text": "second", "embedding": [1.0] }
                ]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(core.vector_store.is_empty());

        let (status, body) = send(
            &app,
            post_json(
                "/vector/bulk_add",
                json!({ "items": [{ "id": "a", "text": "first" }, { "id": "b", "text": "second" }] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["added"], 2);
        assert_eq!(body["records"][1]["id"], "b");
        assert_eq!(core.vector_store.len(), 2);
    }

    #[tokio::test]
    async fn test_search_by_text_ranks_exact_match_first() {
        let (app, _core) = test_app().await;
        send(
            &app,
            post_json(
                "/vector/bulk_add",
                json!({ "items": [
                    { "id": "doc1", "text": "VertexOps is an LLMOps platform" },
                    { "id": "doc2", "text": "Rust is a systems language" },
                    { "id": "doc3", "text": "Cosine similarity ranks vectors" }
                ]}),
            ),
        )
        .await;

        let (status, body) = send(
            &app,
            post_json("/vector/search", json!({ "text": "Rust is a systems language", "top_k": 2 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["id"], "doc2");
        assert!((results[0]["score"].as_f64().unwrap() - 1.0).abs() < 1e-4);
        assert!(results[0].get("embedding").is_none());
    }

    #[tokio::test]
    async fn test_search_on_empty_store() {
        let (app, _core) = test_app().await;
        let (status, body) = send(&app, post_json("/vector/search", json!({ "text": "anything" }))).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["results"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_requires_embedding_or_text() {
        let (app, _core) = test_app().await;
        let (status, body) = send(&app, post_json("/vector/search", json!({ "top_k": 3 }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Provide embedding or text");
    }

    #[tokio::test]
    async fn test_blank_search_text_counts_as_missing() {
        let (app, core) = test_app().await;
        core.vector_store.add("doc1", "something", None, None).unwrap();

        let (status, body) = send(&app, post_json("/vector/search", json!({ "text": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Provide embedding or text");
    }

    #[tokio::test]
    async fn test_malformed_bodies_get_json_errors() {
        let (app, _core) = test_app().await;

        let (status, body) = send(&app, post_json("/vector/search", json!({ "text": "x", "top_k": -1 }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["error_code"], "INVALID_BODY");

        let (status, body) = send(&app, post_json("/vector/add", json!({ "id": "no-text" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error_code"], "INVALID_BODY");

        let request = Request::builder()
            .method("POST")
            .uri("/vector/add")
            .header("content-type", "application/json")
            .header("x-api-key", TEST_KEY)
            .body(Body::from("{\"text\": "))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_body_above_default_extractor_limit_accepted() {
        let (app, core) = test_app().await;
        // larger than axum's built-in 2 MiB cap, well under the configured 16 MiB
        let text = "a".repeat(3 * 1024 * 1024);

        let (status, body) = send(&app, post_json("/vector/add", json!({ "id": "big", "text": text }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"]["id"], "big");
        assert_eq!(core.vector_store.len(), 1);
    }

    #[tokio::test]
    async fn test_body_over_configured_limit_rejected() {
        let (app, core) = test_app_with(ApiConfig {
            max_request_size: 1024,
            ..Default::default()
        })
        .await;
        let text = "a".repeat(4096);

        // no content-length header, so only the extractor limit can catch it
        let (status, body) = send(&app, post_json("/vector/add", json!({ "text": text }))).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error_code"], "REQUEST_TOO_LARGE");

        let declared = Request::builder()
            .method("POST")
            .uri("/vector/add")
            .header("content-type", "application/json")
            .header("content-length", "4096")
            .header("x-api-key", TEST_KEY)
            .body(Body::from("a".repeat(4096)))
            .unwrap();
        let (status, body) = send(&app, declared).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error_code"], "REQUEST_TOO_LARGE");
        assert!(core.vector_store.is_empty());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_unauthorized() {
        let (app, _core) = test_app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/vector/add")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "text": "hi" }).to_string()))
            .unwrap();

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing API Key");
    }

    #[tokio::test]
    async fn test_wrong_api_key_is_forbidden() {
        let (app, core) = test_app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/vector/add")
            .header("content-type", "application/json")
            .header("x-api-key", "wrong")
            .body(Body::from(json!({ "text": "hi" }).to_string()))
            .unwrap();

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Invalid API Key");
        assert!(core.vector_store.is_empty());
    }
}
