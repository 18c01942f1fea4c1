pub mod completion;
pub mod models;
pub mod orchestrator;
pub mod rag;
pub mod storage;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use vertexops_common::{Result, VertexError};
use vertexops_knowledge::{VectorStore, EMBED_DIM};

pub use completion::{CompletionConfig, CompletionProvider, OpenAiCompletions};
pub use models::ModelService;
pub use orchestrator::{JobExecutor, SimulatedExecutor};
pub use rag::{RagAnswer, RagService};
pub use storage::{JsonFileStorage, MemoryStorage, ModelStorage};

/// Long-lived services shared by every request handler.
pub struct VertexCore {
    pub vector_store: Arc<VectorStore>,
    pub model_service: Arc<ModelService>,
    pub rag_service: Arc<RagService>,
    pub config: CoreConfig,
}

impl VertexCore {
    pub async fn new(config: CoreConfig) -> Result<Self> {
        let storage = storage::create_storage(&config);
        let executor: Arc<dyn JobExecutor> = Arc::new(SimulatedExecutor::new(
            config.deploy_delay(),
            config.finetune_delay(),
        ));
        let completion = OpenAiCompletions::from_config(&config.completion)
            .map(|provider| Arc::new(provider) as Arc<dyn CompletionProvider>);

        Self::with_components(config, storage, executor, completion).await
    }

    /// Builds the core from explicit collaborators.
    pub async fn with_components(
        config: CoreConfig,
        storage: Arc<dyn ModelStorage>,
        executor: Arc<dyn JobExecutor>,
        completion: Option<Arc<dyn CompletionProvider>>,
    ) -> Result<Self> {
        config.validate()?;

        let vector_store = Arc::new(VectorStore::new(config.embedding_dimension));
        let model_service = Arc::new(ModelService::new(storage, executor).await?);

        if completion.is_some() {
            info!("Completion provider configured, RAG answers use the remote model");
        } else {
            info!("No completion provider configured, RAG answers use the local template");
        }
        let rag_service = Arc::new(RagService::new(
            vector_store.clone(),
            completion,
            config.completion.fallback_snippets,
        ));

        Ok(Self {
            vector_store,
            model_service,
            rag_service,
            config,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub embedding_dimension: usize,
    /// Registry file; `None` keeps the registry in memory only.
    pub models_file: Option<String>,
    pub deploy_delay_ms: u64,
    pub finetune_delay_ms: u64,
    pub completion: CompletionConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            embedding_dimension: EMBED_DIM,
            models_file: Some("vertexops/models.json".to_string()),
            deploy_delay_ms: 2000,
            finetune_delay_ms: 3000,
            completion: CompletionConfig::default(),
        }
    }
}

impl CoreConfig {
    /// In-memory registry and near-instant jobs.
    pub fn for_tests() -> Self {
        Self {
            models_file: None,
            deploy_delay_ms: 10,
            finetune_delay_ms: 10,
            ..Self::default()
        }
    }

    pub fn deploy_delay(&self) -> Duration {
        Duration::from_millis(self.deploy_delay_ms)
    }

    pub fn finetune_delay(&self) -> Duration {
        Duration::from_millis(self.finetune_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding_dimension == 0 {
            return Err(VertexError::Configuration(
                "embedding_dimension must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_config_default() {
        let config = CoreConfig::default();
        assert_eq!(config.embedding_dimension, 128);
        assert_eq!(config.models_file.as_deref(), Some("vertexops/models.json"));
        assert_eq!(config.deploy_delay(), Duration::from_secs(2));
        assert_eq!(config.finetune_delay(), Duration::from_secs(3));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let config = CoreConfig {
            embedding_dimension: 0,
            ..CoreConfig::for_tests()
        };
        assert!(matches!(config.validate(), Err(VertexError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_core_creation() {
        let core = VertexCore::new(CoreConfig::for_tests()).await.unwrap();
        assert_eq!(core.vector_store.dimension(), 128);
        assert!(core.vector_store.is_empty());
        assert!(core.model_service.list_models().await.is_empty());
    }
}
