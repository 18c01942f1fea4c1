use crate::error::ApiError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use tracing::warn;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Static shared-secret check.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    api_key: String,
}

impl ApiKeyAuth {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    pub fn verify(&self, provided: Option<&str>) -> Result<(), ApiError> {
        match provided {
            None | Some("") => Err(ApiError::MissingApiKey),
            Some(key) if key == self.api_key => Ok(()),
            Some(_) => {
                warn!("Rejected request with invalid API key");
                Err(ApiError::InvalidApiKey)
            }
        }
    }
}

/// Extractor that admits the request only with a valid `x-api-key` header.
/// Expects `Arc<ApiKeyAuth>` in the request extensions (see
/// [`auth_middleware`](crate::middleware::auth_middleware)).
#[derive(Debug, Clone, Copy)]
pub struct ApiKey;

#[async_trait]
impl<S> FromRequestParts<S> for ApiKey
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .extensions
            .get::<Arc<ApiKeyAuth>>()
            .ok_or_else(|| ApiError::Internal("Auth service not available".to_string()))?;

        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        auth.verify(provided)?;
        Ok(ApiKey)
    }
}
