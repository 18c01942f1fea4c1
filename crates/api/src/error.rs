use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use vertexops_common::VertexError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing API Key")]
    MissingApiKey,

    #[error("Invalid API Key")]
    InvalidApiKey,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request too large")]
    RequestTooLarge,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Core service error: {0}")]
    CoreService(#[from] VertexError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn parts(self) -> (StatusCode, String, &'static str) {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, "VALIDATION_ERROR"),
            ApiError::MissingApiKey => (
                StatusCode::UNAUTHORIZED,
                "Missing API Key".to_string(),
                "MISSING_API_KEY",
            ),
            ApiError::InvalidApiKey => (
                StatusCode::FORBIDDEN,
                "Invalid API Key".to_string(),
                "INVALID_API_KEY",
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            ApiError::RequestTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request payload too large".to_string(),
                "REQUEST_TOO_LARGE",
            ),
            ApiError::InvalidBody(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg, "INVALID_BODY"),
            ApiError::CoreService(err) => match err {
                VertexError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, "VALIDATION_ERROR"),
                err @ VertexError::DimensionMismatch { .. } => {
                    (StatusCode::BAD_REQUEST, err.to_string(), "DIMENSION_MISMATCH")
                }
                VertexError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
                other => {
                    error!("Core service error: {}", other);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                        "INTERNAL_ERROR",
                    )
                }
            },
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_ERROR",
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_code) = self.parts();

        let response_body = json!({
            "success": false,
            "error": error_message,
            "detail": error_message,
            "error_code": error_code,
            "timestamp": chrono::Utc::now()
        });

        (status, Json(response_body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::InvalidBody(e.body_text()),
            other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => ApiError::RequestTooLarge,
            other => ApiError::Validation(other.body_text()),
        }
    }
}

// Helper function to create validation errors
pub fn validation_error(message: &str) -> ApiError {
    ApiError::Validation(message.to_string())
}

// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let response = validation_error("Provide embedding or text").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_auth_errors() {
        assert_eq!(ApiError::MissingApiKey.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidApiKey.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_body_errors() {
        assert_eq!(
            ApiError::InvalidBody("top_k: invalid value".to_string()).into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::RequestTooLarge.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_core_errors_map_to_status() {
        let mismatch = ApiError::from(VertexError::DimensionMismatch { expected: 128, actual: 2 });
        assert_eq!(mismatch.into_response().status(), StatusCode::BAD_REQUEST);

        let missing = ApiError::from(VertexError::NotFound("Model not found".to_string()));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let io = ApiError::from(VertexError::Persistence("disk full".to_string()));
        assert_eq!(io.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
