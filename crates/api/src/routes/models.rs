use crate::{
    auth::ApiKey,
    error::{ApiError, ApiResult},
    extract::JsonBody,
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{collections::BTreeMap, sync::Arc};
use vertexops_common::{Job, Metadata, ModelEntry};
use vertexops_core::VertexCore;

#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    pub model_type: String,
    #[serde(default)]
    pub config: Metadata,
}

#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub model_id: String,
    pub status: String,
    pub message: Option<String>,
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FineTuneRequest {
    pub dataset_uri: String,
}

#[derive(Debug, Serialize)]
pub struct FineTuneResponse {
    pub job_id: String,
    pub status: String,
}

pub fn routes(core: Arc<VertexCore>) -> Router {
    Router::new()
        .route("/models", get(list_models))
        .route("/models/deploy", post(deploy_model))
        .route("/models/:model_id", get(get_model))
        .route("/models/:model_id/finetune", post(fine_tune_model))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:job_id", get(get_job))
        .with_state(core)
}

async fn deploy_model(
    State(core): State<Arc<VertexCore>>,
    _key: ApiKey,
    JsonBody(request): JsonBody<DeployRequest>,
) -> ApiResult<Json<DeployResponse>> {
    let (entry, job) = core
        .model_service
        .deploy_model(&request.model_type, request.config)
        .await?;

    Ok(Json(DeployResponse {
        model_id: entry.model_id,
        status: entry.status.as_str().to_string(),
        message: entry.message,
        job_id: job.job_id,
    }))
}

async fn fine_tune_model(
    State(core): State<Arc<VertexCore>>,
    Path(model_id): Path<String>,
    _key: ApiKey,
    JsonBody(request): JsonBody<FineTuneRequest>,
) -> ApiResult<Json<FineTuneResponse>> {
    let job = core
        .model_service
        .fine_tune(&model_id, &request.dataset_uri)
        .await?;

    Ok(Json(FineTuneResponse {
        job_id: job.job_id,
        status: job.status.as_str().to_string(),
    }))
}

async fn list_models(
    State(core): State<Arc<VertexCore>>,
    _key: ApiKey,
) -> Json<BTreeMap<String, ModelEntry>> {
    Json(core.model_service.list_models().await)
}

async fn get_model(
    State(core): State<Arc<VertexCore>>,
    Path(model_id): Path<String>,
    _key: ApiKey,
) -> ApiResult<Json<ModelEntry>> {
    core.model_service
        .get_model(&model_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Model not found".to_string()))
}

async fn list_jobs(State(core): State<Arc<VertexCore>>, _key: ApiKey) -> Json<Value> {
    let jobs = core.model_service.list_jobs().await;
    Json(json!({ "jobs": jobs }))
}

async fn get_job(
    State(core): State<Arc<VertexCore>>,
    Path(job_id): Path<String>,
    _key: ApiKey,
) -> ApiResult<Json<Job>> {
    core.model_service
        .get_job(&job_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::*;
    use axum::{http::StatusCode, Router};
    use serde_json::{json, Value};
    use std::time::Duration;

    async fn wait_for_job(app: &Router, job_id: &str) -> Value {
        for _ in 0..100 {
            let (_, job) = send(app, get(&format!("/jobs/{}", job_id))).await;
            if job["status"] == "succeeded" || job["status"] == "failed" {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish", job_id);
    }

    #[tokio::test]
    async fn test_deploy_then_finetune() {
        let (app, _core) = test_app().await;

        let (status, deployed) = send(
            &app,
            post_json("/models/deploy", json!({ "model_type": "openai", "config": { "temperature": 0.2 } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deployed["status"], "deploying");
        assert_eq!(deployed["message"], "Starting deployment");
        let model_id = deployed["model_id"].as_str().unwrap().to_string();
        assert!(model_id.starts_with("model-"));

        let job = wait_for_job(&app, deployed["job_id"].as_str().unwrap()).await;
        assert_eq!(job["status"], "succeeded");

        let (status, model) = send(&app, get(&format!("/models/{}", model_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(model["status"], "deployed");
        assert_eq!(model["config"]["temperature"], 0.2);

        let (status, tuned) = send(
            &app,
            post_json(
                &format!("/models/{}/finetune", model_id),
                json!({ "dataset_uri": "gs://bucket/data.csv" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tuned["status"], "pending");

        let job = wait_for_job(&app, tuned["job_id"].as_str().unwrap()).await;
        assert_eq!(job["status"], "succeeded");
        assert_eq!(job["dataset_uri"], "gs://bucket/data.csv");

        let (_, listed) = send(&app, get("/models")).await;
        assert_eq!(listed[&model_id]["version"], 1);

        let (_, jobs) = send(&app, get("/jobs")).await;
        assert_eq!(jobs["jobs"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_finetune_unknown_model() {
        let (app, _core) = test_app().await;
        let (status, body) = send(
            &app,
            post_json("/models/missing/finetune", json!({ "dataset_uri": "local.csv" })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Model not found");
    }

    #[tokio::test]
    async fn test_unknown_model_and_job() {
        let (app, _core) = test_app().await;

        let (status, _) = send(&app, get("/models/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get("/jobs/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let (app, _core) = test_app().await;
        let (status, body) = send(&app, get("/models")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn test_blank_model_type_rejected() {
        let (app, _core) = test_app().await;
        let (status, _) = send(&app, post_json("/models/deploy", json!({ "model_type": " " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
