use crate::CoreConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};
use vertexops_common::{ModelEntry, Result, VertexError};

pub type ModelMap = HashMap<String, ModelEntry>;

/// Where the model registry is persisted between restarts.
#[async_trait]
pub trait ModelStorage: Send + Sync {
    async fn load(&self) -> Result<ModelMap>;
    async fn save(&self, models: &ModelMap) -> Result<()>;
}

pub fn create_storage(config: &CoreConfig) -> Arc<dyn ModelStorage> {
    match &config.models_file {
        Some(path) => Arc::new(JsonFileStorage::new(path)),
        None => Arc::new(MemoryStorage::default()),
    }
}

/// Pretty-printed JSON object keyed by model id.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl ModelStorage for JsonFileStorage {
    async fn load(&self) -> Result<ModelMap> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            info!("Creating model registry at {}", self.path.display());
            let empty = ModelMap::new();
            self.save(&empty).await?;
            return Ok(empty);
        }

        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not read model registry {}: {}", self.path.display(), e);
                return Ok(ModelMap::new());
            }
        };

        match serde_json::from_slice::<ModelMap>(&raw) {
            Ok(models) => {
                info!("Loaded {} models from {}", models.len(), self.path.display());
                Ok(models)
            }
            Err(e) => {
                warn!("Ignoring corrupt model registry {}: {}", self.path.display(), e);
                Ok(ModelMap::new())
            }
        }
    }

    async fn save(&self, models: &ModelMap) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                VertexError::Persistence(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_vec_pretty(models)
            .map_err(|e| VertexError::Internal(format!("Failed to serialize models: {}", e)))?;

        tokio::fs::write(&self.path, json).await.map_err(|e| {
            VertexError::Persistence(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        debug!("Persisted {} models to {}", models.len(), self.path.display());
        Ok(())
    }
}

/// Keeps the last saved snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    snapshot: Mutex<ModelMap>,
}

impl MemoryStorage {
    pub fn snapshot(&self) -> ModelMap {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ModelStorage for MemoryStorage {
    async fn load(&self) -> Result<ModelMap> {
        Ok(self.snapshot())
    }

    async fn save(&self, models: &ModelMap) -> Result<()> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = models.clone();
        Ok(())
    }
}
