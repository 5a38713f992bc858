/*!
 * Public publish operations: start a publish and poll its job.
 *
 * Publishing is fire-and-forget: after the synchronous precondition checks
 * pass, the pipeline runs on a spawned task and the caller polls the job id
 * from the returned receipt.
 */

use log::info;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::app_config::Config;
use crate::database::models::{JobRecord, JobStatus};
use crate::database::Repository;
use crate::errors::PublishError;
use crate::providers::{
    GradingContextLinker, LanguageDetector, ModerationGate, TranslationProvider,
};
use crate::publish::orchestrator::{validate_settings, PublishPipeline};
use crate::publish::DesiredState;

/// Returned synchronously when a publish is accepted
#[derive(Debug, Clone, Serialize)]
pub struct PublishReceipt {
    /// Id of the job to poll
    pub job_id: String,
    /// Human-readable acknowledgement
    pub message: String,
}

/// Snapshot of a job as seen by a polling caller
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusView {
    /// Job id
    pub job_id: String,
    /// Current status
    pub status: JobStatus,
    /// Latest progress message
    pub progress_message: String,
    /// Progress percentage (0-100)
    pub percentage: i64,
    /// Result payload, present once the job is terminal
    pub result: Option<serde_json::Value>,
}

impl From<JobRecord> for JobStatusView {
    fn from(job: JobRecord) -> Self {
        let result = job
            .result
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok());

        Self {
            job_id: job.id,
            status: job.status,
            progress_message: job.progress_message,
            percentage: job.percentage,
            result,
        }
    }
}

/// Entry point for publishing assignments and polling publish jobs
pub struct PublishService {
    /// Repository for job reads and creation
    repo: Repository,
    /// Shared pipeline run by spawned tasks
    pipeline: Arc<PublishPipeline>,
}

impl PublishService {
    /// Create a service wiring the pipeline from its collaborators
    pub fn new(
        repo: Repository,
        provider: Arc<dyn TranslationProvider>,
        detector: Arc<dyn LanguageDetector>,
        gate: Arc<dyn ModerationGate>,
        linker: Arc<dyn GradingContextLinker>,
        config: &Config,
    ) -> Self {
        let pipeline = Arc::new(PublishPipeline::new(
            repo.clone(),
            provider,
            detector,
            gate,
            linker,
            config,
        ));

        Self { repo, pipeline }
    }

    /// Start publishing an assignment.
    ///
    /// Precondition failures (missing assignment, missing introduction)
    /// surface here, before any job is created. On success the pipeline
    /// runs on a spawned task and the receipt carries the job id to poll.
    pub async fn publish_assignment(
        &self,
        assignment_id: i64,
        desired: DesiredState,
        author_user_id: &str,
    ) -> Result<PublishReceipt, PublishError> {
        validate_settings(&desired.settings)?;
        self.repo
            .get_assignment(assignment_id)
            .await?
            .ok_or_else(|| {
                PublishError::Precondition(format!("Assignment {} not found", assignment_id))
            })?;

        let job_id = Uuid::new_v4().to_string();
        self.repo
            .create_job(&JobRecord::new(job_id.clone(), assignment_id))
            .await?;

        info!("Starting publish job {} for assignment {}", job_id, assignment_id);

        let pipeline = self.pipeline.clone();
        let spawned_job_id = job_id.clone();
        let author = author_user_id.to_string();
        tokio::spawn(async move {
            pipeline
                .run(&spawned_job_id, assignment_id, desired, &author)
                .await;
        });

        Ok(PublishReceipt {
            job_id,
            message: "Publish started".to_string(),
        })
    }

    /// Get the current state of a publish job
    pub async fn get_job_status(&self, job_id: &str) -> Result<JobStatusView, PublishError> {
        let job = self
            .repo
            .get_job(job_id)
            .await?
            .ok_or_else(|| PublishError::JobNotFound(job_id.to_string()))?;

        Ok(JobStatusView::from(job))
    }
}
