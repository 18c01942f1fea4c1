use crate::orchestrator::{spawn_worker, JobExecutor, JobQueue};
use crate::storage::{ModelMap, ModelStorage};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};
use vertexops_common::{
    short_id, Job, JobKind, JobStatus, Metadata, ModelEntry, ModelStatus, Result, VertexError,
};

/// Model entries and job records shared between the service and the worker.
pub(crate) struct ModelRegistry {
    models: RwLock<ModelMap>,
    jobs: RwLock<HashMap<String, Job>>,
    storage: Arc<dyn ModelStorage>,
}

impl ModelRegistry {
    pub(crate) async fn get_model(&self, model_id: &str) -> Option<ModelEntry> {
        self.models.read().await.get(model_id).cloned()
    }

    /// Pending -> Running. Returns the updated job.
    pub(crate) async fn start_job(&self, job_id: &str) -> Option<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(job_id)?;
        if !job.advance(JobStatus::Running) {
            warn!("Job {} is {} and cannot start", job_id, job.status.as_str());
            return None;
        }
        Some(job.clone())
    }

    /// Applies the job outcome to the model, persists, then closes the job.
    pub(crate) async fn finish_job(&self, job: &Job, outcome: Result<String>) {
        let outcome = match outcome {
            Ok(message) => self.apply_success(job, message).await,
            Err(e) => {
                if job.kind == JobKind::Deploy {
                    self.update_model(&job.model_id, |model| {
                        model.status = ModelStatus::Failed;
                        model.message = Some(e.to_string());
                    })
                    .await;
                }
                Err(e)
            }
        };

        let status = if outcome.is_ok() { JobStatus::Succeeded } else { JobStatus::Failed };
        let mut jobs = self.jobs.write().await;
        if let Some(record) = jobs.get_mut(&job.job_id) {
            if record.advance(status) {
                record.message = Some(match outcome {
                    Ok(message) => message,
                    Err(e) => e.to_string(),
                });
                metrics::counter!(
                    "vertexops_jobs_total",
                    "kind" => job.kind.as_str(),
                    "status" => status.as_str()
                )
                .increment(1);
                info!("Job {} {}", job.job_id, status.as_str());
            } else {
                warn!("Ignoring late {} result for job {}", status.as_str(), job.job_id);
            }
        }
    }

    async fn apply_success(&self, job: &Job, message: String) -> Result<String> {
        let job_id = job.job_id.clone();
        let updated = match job.kind {
            JobKind::Deploy => {
                let message = message.clone();
                self.update_model(&job.model_id, move |model| {
                    model.status = ModelStatus::Deployed;
                    model.message = Some(message);
                })
                .await
            }
            JobKind::FineTune => {
                let message = message.clone();
                self.update_model(&job.model_id, move |model| {
                    model.version += 1;
                    model.status = ModelStatus::Deployed;
                    model.last_finetune_job = Some(job_id);
                    model.message = Some(message);
                })
                .await
            }
        };

        if updated {
            Ok(message)
        } else {
            Err(VertexError::NotFound(format!("Model {} no longer exists", job.model_id)))
        }
    }

    /// Mutates and persists a model under the registry lock. Returns `false`
    /// if the model is gone.
    async fn update_model<F>(&self, model_id: &str, apply: F) -> bool
    where
        F: FnOnce(&mut ModelEntry),
    {
        let mut models = self.models.write().await;
        let Some(model) = models.get_mut(model_id) else {
            return false;
        };
        apply(model);
        model.updated_at = Utc::now();

        if let Err(e) = self.storage.save(&models).await {
            error!("Failed to persist model registry: {}", e);
        }
        true
    }
}

/// Model registry plus simulated deployment and fine-tuning jobs.
pub struct ModelService {
    registry: Arc<ModelRegistry>,
    queue: JobQueue,
}

impl ModelService {
    /// Loads the persisted registry and starts the job worker. Must be called
    /// from within a Tokio runtime.
    pub async fn new(storage: Arc<dyn ModelStorage>, executor: Arc<dyn JobExecutor>) -> Result<Self> {
        let models = storage.load().await?;
        info!("Model service initialized with {} models", models.len());

        let registry = Arc::new(ModelRegistry {
            models: RwLock::new(models),
            jobs: RwLock::new(HashMap::new()),
            storage,
        });
        let queue = spawn_worker(registry.clone(), executor);

        Ok(Self { registry, queue })
    }

    /// Registers a model in `deploying` state and queues its deployment.
    #[instrument(skip(self, config))]
    pub async fn deploy_model(&self, model_type: &str, config: Metadata) -> Result<(ModelEntry, Job)> {
        let model_type = model_type.trim();
        if model_type.is_empty() {
            return Err(VertexError::Validation("model_type must not be empty".to_string()));
        }

        let now = Utc::now();
        let entry = ModelEntry {
            model_id: short_id("model"),
            model_type: model_type.to_string(),
            config,
            status: ModelStatus::Deploying,
            created_at: now,
            updated_at: now,
            message: Some("Starting deployment".to_string()),
            version: 0,
            last_finetune_job: None,
        };

        {
            let mut models = self.registry.models.write().await;
            models.insert(entry.model_id.clone(), entry.clone());
            if let Err(e) = self.registry.storage.save(&models).await {
                models.remove(&entry.model_id);
                error!("Failed to persist new model {}: {}", entry.model_id, e);
                return Err(e);
            }
        }
        info!("Deploying model {} ({})", entry.model_id, entry.model_type);

        let job = self.submit(Job::new(JobKind::Deploy, &entry.model_id, None)).await?;
        Ok((entry, job))
    }

    /// Queues a fine-tuning job against an existing model.
    #[instrument(skip(self))]
    pub async fn fine_tune(&self, model_id: &str, dataset_uri: &str) -> Result<Job> {
        let dataset_uri = dataset_uri.trim();
        if dataset_uri.is_empty() {
            return Err(VertexError::Validation("dataset_uri must not be empty".to_string()));
        }
        if self.registry.get_model(model_id).await.is_none() {
            return Err(VertexError::NotFound("Model not found".to_string()));
        }

        self.submit(Job::new(JobKind::FineTune, model_id, Some(dataset_uri.to_string())))
            .await
    }

    pub async fn get_model(&self, model_id: &str) -> Option<ModelEntry> {
        self.registry.get_model(model_id).await
    }

    /// All models keyed by id, in id order.
    pub async fn list_models(&self) -> BTreeMap<String, ModelEntry> {
        self.registry
            .models
            .read()
            .await
            .iter()
            .map(|(id, model)| (id.clone(), model.clone()))
            .collect()
    }

    pub async fn get_job(&self, job_id: &str) -> Option<Job> {
        self.registry.jobs.read().await.get(job_id).cloned()
    }

    /// All jobs, oldest first.
    pub async fn list_jobs(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.registry.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        jobs
    }

    async fn submit(&self, job: Job) -> Result<Job> {
        self.registry
            .jobs
            .write()
            .await
            .insert(job.job_id.clone(), job.clone());

        if let Err(e) = self.queue.submit(&job.job_id) {
            if let Some(record) = self.registry.jobs.write().await.get_mut(&job.job_id) {
                record.advance(JobStatus::Failed);
                record.message = Some(e.to_string());
            }
            return Err(e);
        }

        Ok(job)
    }
}
