use crate::models::ModelRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use vertexops_common::{JobKind, ModelEntry, Result, VertexError};

/// Performs the actual work behind a deployment or fine-tuning job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Returns a human-readable status message on success.
    async fn deploy(&self, model: &ModelEntry) -> Result<String>;

    async fn fine_tune(&self, model: &ModelEntry, dataset_uri: &str) -> Result<String>;
}

/// Stands in for real infrastructure by waiting a fixed time.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    deploy_delay: Duration,
    finetune_delay: Duration,
}

impl SimulatedExecutor {
    pub fn new(deploy_delay: Duration, finetune_delay: Duration) -> Self {
        Self {
            deploy_delay,
            finetune_delay,
        }
    }
}

#[async_trait]
impl JobExecutor for SimulatedExecutor {
    async fn deploy(&self, model: &ModelEntry) -> Result<String> {
        debug!("Simulating deployment of {} ({:?})", model.model_id, self.deploy_delay);
        tokio::time::sleep(self.deploy_delay).await;
        Ok("Deployment succeeded (simulated)".to_string())
    }

    async fn fine_tune(&self, model: &ModelEntry, dataset_uri: &str) -> Result<String> {
        debug!(
            "Simulating fine-tune of {} on {} ({:?})",
            model.model_id, dataset_uri, self.finetune_delay
        );
        tokio::time::sleep(self.finetune_delay).await;
        Ok(format!("Fine-tuned on {} (simulated)", dataset_uri))
    }
}

/// Sending half of the job queue. Dropping it stops the worker once the
/// queue drains.
#[derive(Debug, Clone)]
pub(crate) struct JobQueue {
    tx: mpsc::UnboundedSender<String>,
}

impl JobQueue {
    pub(crate) fn submit(&self, job_id: &str) -> Result<()> {
        self.tx
            .send(job_id.to_string())
            .map_err(|_| VertexError::Internal("Job worker is not running".to_string()))
    }
}

/// Starts the background worker. Each submitted job id runs as its own task
/// so a slow job does not hold up the ones behind it.
pub(crate) fn spawn_worker(registry: Arc<ModelRegistry>, executor: Arc<dyn JobExecutor>) -> JobQueue {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        info!("Job worker started");
        while let Some(job_id) = rx.recv().await {
            let registry = registry.clone();
            let executor = executor.clone();
            tokio::spawn(async move {
                run_job(&registry, executor.as_ref(), &job_id).await;
            });
        }
        info!("Job worker stopped");
    });

    JobQueue { tx }
}

async fn run_job(registry: &ModelRegistry, executor: &dyn JobExecutor, job_id: &str) {
    let Some(job) = registry.start_job(job_id).await else {
        warn!("Job {} could not be started", job_id);
        return;
    };
    info!("Running {} job {} for {}", job.kind.as_str(), job.job_id, job.model_id);

    let Some(model) = registry.get_model(&job.model_id).await else {
        let err = VertexError::NotFound(format!("Model {} no longer exists", job.model_id));
        registry.finish_job(&job, Err(err)).await;
        return;
    };

    let outcome = match job.kind {
        JobKind::Deploy => executor.deploy(&model).await,
        JobKind::FineTune => {
            let dataset_uri = job.dataset_uri.as_deref().unwrap_or_default();
            executor.fine_tune(&model, dataset_uri).await
        }
    };

    if let Err(e) = &outcome {
        error!("Job {} failed: {}", job.job_id, e);
    }
    registry.finish_job(&job, outcome).await;
}
