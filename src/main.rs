use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vertexops_api::{ApiServer, LoggingConfig, Settings};
use vertexops_core::VertexCore;

const DEFAULT_LOG_FILTER: &str = "vertexops=debug,tower_http=debug,axum=info";

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let settings = Settings::load().context("Failed to load configuration")?;
    init_tracing(&settings.logging);

    info!("Starting VertexOps API v{}...", vertexops_api::API_VERSION);

    let core = VertexCore::new(settings.core.clone())
        .await
        .context("Failed to initialize core services")?;

    let server = ApiServer::new(settings.server, Arc::new(core));
    server.start().await.context("API server failed")?;

    info!("VertexOps API shut down");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(logging.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
