use crate::{
    auth::ApiKeyAuth,
    middleware::{
        auth_middleware, cors_layer, request_id_middleware, request_logging_middleware,
        request_size_middleware, security_headers_middleware, timeout_layer,
    },
    routes::{create_routes, not_found_handler},
    telemetry, ApiConfig,
};
use axum::{extract::DefaultBodyLimit, Router};
use std::{sync::Arc, time::Duration};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use vertexops_core::VertexCore;

const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

pub struct ApiServer {
    config: ApiConfig,
    core: Arc<VertexCore>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, core: Arc<VertexCore>) -> Self {
        Self { config, core }
    }

    pub async fn start(&self) -> std::io::Result<()> {
        let app = create_app(&self.config, self.core.clone());
        let addr = self.config.bind_address();

        info!("Starting API server on {}", addr);
        info!("CORS origins: {:?}", self.config.cors_origins);

        self.start_background_tasks();

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("API server listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server stopped");
        Ok(())
    }

    fn start_background_tasks(&self) {
        // histogram buckets are drained on upkeep
        let handle = telemetry::handle();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
            loop {
                interval.tick().await;
                handle.run_upkeep();
            }
        });

        info!("Background tasks started");
    }

    pub fn get_config(&self) -> &ApiConfig {
        &self.config
    }
}

/// Full router with the middleware stack applied.
pub fn create_app(config: &ApiConfig, core: Arc<VertexCore>) -> Router {
    let auth = Arc::new(ApiKeyAuth::new(config.api_key.clone()));

    create_routes(core, telemetry::handle())
        .fallback(not_found_handler)
        .layer(
            ServiceBuilder::new()
                // Outermost layers (applied last)
                .layer(TraceLayer::new_for_http())
                // Logging and metrics see every response, timeouts and rejections included
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(timeout_layer(config))
                .layer(cors_layer(config))
                // Security and validation layers
                .layer(axum::middleware::from_fn(security_headers_middleware))
                .layer(axum::middleware::from_fn_with_state(
                    config.max_request_size,
                    request_size_middleware,
                ))
                .layer(DefaultBodyLimit::max(config.max_request_size))
                // Authentication layer
                .layer(axum::middleware::from_fn_with_state(auth, auth_middleware)),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::*;
    use axum::http::StatusCode;
    use vertexops_core::CoreConfig;

    #[tokio::test]
    async fn test_server_creation() {
        let core = Arc::new(VertexCore::new(CoreConfig::for_tests()).await.unwrap());
        let server = ApiServer::new(ApiConfig::default(), core);
        assert_eq!(server.get_config().port, 8080);
    }

    #[tokio::test]
    async fn test_middleware_headers_applied() {
        let (app, _core) = test_app().await;
        let response = tower::ServiceExt::oneshot(app, get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_rejected_requests_are_counted() {
        let (app, _core) = test_app_with(ApiConfig {
            max_request_size: 16,
            ..Default::default()
        })
        .await;
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/rag/query")
            .header("content-type", "application/json")
            .header("content-length", "64")
            .header("x-api-key", TEST_KEY)
            .body(axum::body::Body::from("x".repeat(64)))
            .unwrap();

        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let rendered = telemetry::handle().render();
        assert!(rendered.lines().any(|line| line.starts_with(telemetry::REQUESTS_TOTAL)
            && line.contains("endpoint=\"/rag/query\"")
            && line.contains("status=\"413\"")));
    }

    #[tokio::test]
    async fn test_request_metrics_use_route_template() {
        let (app, _core) = test_app().await;
        send(&app, get("/models/some-model-id")).await;

        let rendered = telemetry::handle().render();
        assert!(rendered.contains("endpoint=\"/models/:model_id\""));
        assert!(!rendered.contains("some-model-id"));
    }
}
