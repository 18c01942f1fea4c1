pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod settings;
pub mod telemetry;

use serde::{Deserialize, Serialize};

pub use server::{create_app, ApiServer};
pub use settings::{LoggingConfig, Settings};

// Re-export core crates
pub use vertexops_common;
pub use vertexops_core;

/// Service version reported by `/api`.
pub const API_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Shared secret expected in the `x-api-key` header.
    pub api_key: String,
    pub max_request_size: usize,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            api_key: "supersecret123".to_string(),
            max_request_size: 16 * 1024 * 1024, // 16MB
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
