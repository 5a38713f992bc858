/*!
 * The publish pipeline state machine.
 *
 * A run moves a job from Pending to InProgress and through four sequential
 * steps. Any step failure moves the job to Failed with the captured message
 * and skips the remaining steps; there is no rollback of writes already made.
 * Both terminal states carry a result payload.
 */

use futures::stream::{self, StreamExt};
use log::{error, info};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::app_config::Config;
use crate::database::models::{
    content_hash, AssignmentField, AssignmentSettings, JobStatus, QuestionRecord,
};
use crate::database::Repository;
use crate::errors::PublishError;
use crate::providers::{
    GradingContextLinker, LanguageDetector, ModerationGate, TranslationProvider,
};
use crate::publish::limiter::TranslationLimiter;
use crate::publish::progress::ProgressTracker;
use crate::publish::reconcile::{ReconcileOutcome, ReconciledQuestion, ReconciliationEngine};
use crate::publish::translate::{TranslationEngine, TranslationOwner, TranslationUnit};
use crate::publish::DesiredState;

/// Step target percentages, strictly increasing
const SETTINGS_TARGET: i64 = 10;
const QUESTIONS_TARGET: i64 = 20;
const ASSIGNMENT_TRANSLATIONS_TARGET: i64 = 70;
const FINALIZE_TARGET: i64 = 90;

/// Result payload stored on a completed job
#[derive(Debug, Serialize)]
struct PublishResult {
    /// Final active questions with their variants, choices in structured form
    questions: Vec<ReconciledQuestion>,
}

/// Validate the submitted settings before any step runs.
///
/// An assignment cannot be published without an introduction; this is the
/// precondition surfaced synchronously to the caller.
pub fn validate_settings(settings: &AssignmentSettings) -> Result<(), PublishError> {
    if settings.name.trim().is_empty() {
        return Err(PublishError::Precondition(
            "Assignment name is required".to_string(),
        ));
    }

    match &settings.introduction {
        Some(text) if !text.trim().is_empty() => Ok(()),
        _ => Err(PublishError::Precondition(
            "Assignment introduction is required to publish".to_string(),
        )),
    }
}

/// Runs publish jobs through the four-step pipeline
pub struct PublishPipeline {
    /// Repository for job and assignment writes
    repo: Repository,
    /// Question tree reconciliation
    reconciler: ReconciliationEngine,
    /// Per-entity translation
    engine: TranslationEngine,
    /// Grading-context link computation at finalize
    linker: Arc<dyn GradingContextLinker>,
    /// Target languages every published assignment is translated into
    languages: Vec<String>,
    /// Percentage where translation progress starts
    base_percentage: i64,
    /// Percentage span translation progress covers
    range_percentage: i64,
}

impl PublishPipeline {
    /// Create a pipeline from its collaborators and configuration
    pub fn new(
        repo: Repository,
        provider: Arc<dyn TranslationProvider>,
        detector: Arc<dyn LanguageDetector>,
        gate: Arc<dyn ModerationGate>,
        linker: Arc<dyn GradingContextLinker>,
        config: &Config,
    ) -> Self {
        let limiter = TranslationLimiter::new(config.publish.max_concurrent_translations);

        Self {
            reconciler: ReconciliationEngine::new(repo.clone(), gate),
            engine: TranslationEngine::new(repo.clone(), provider, detector, limiter),
            linker,
            languages: config.supported_languages.clone(),
            base_percentage: config.publish.translation_base_percentage as i64,
            range_percentage: config.publish.translation_range_percentage as i64,
            repo,
        }
    }

    /// Run one publish job to a terminal state.
    ///
    /// Never returns an error: failures are captured on the job record,
    /// which is what the polling caller observes.
    pub async fn run(
        &self,
        job_id: &str,
        assignment_id: i64,
        desired: DesiredState,
        author_user_id: &str,
    ) {
        if let Err(e) = self
            .repo
            .update_job_status(job_id, JobStatus::InProgress, "Publish started")
            .await
        {
            error!("Failed to start job {}: {}", job_id, e);
            return;
        }

        let progress = ProgressTracker::new(
            self.repo.clone(),
            job_id,
            self.base_percentage,
            self.range_percentage,
        );

        let terminal = match self
            .execute(&progress, assignment_id, &desired, author_user_id)
            .await
        {
            Ok(payload) => {
                info!("Publish job {} completed for assignment {}", job_id, assignment_id);
                self.repo
                    .complete_job(job_id, JobStatus::Completed, "Publish complete", Some(payload))
                    .await
            }
            Err(e) => {
                error!("Publish job {} failed: {}", job_id, e);
                let payload = serde_json::json!({ "error": e.to_string() }).to_string();
                self.repo
                    .complete_job(
                        job_id,
                        JobStatus::Failed,
                        &format!("Publish failed: {}", e),
                        Some(payload),
                    )
                    .await
            }
        };

        if let Err(e) = terminal {
            error!("Failed to record terminal state for job {}: {}", job_id, e);
        }
    }

    /// The four sequential steps; returns the success result payload
    async fn execute(
        &self,
        progress: &ProgressTracker,
        assignment_id: i64,
        desired: &DesiredState,
        author_user_id: &str,
    ) -> Result<String, PublishError> {
        // Step 1: settings
        progress.step_started("Saving assignment settings", SETTINGS_TARGET).await?;
        validate_settings(&desired.settings)?;
        self.repo
            .get_assignment(assignment_id)
            .await?
            .ok_or_else(|| {
                PublishError::Precondition(format!("Assignment {} not found", assignment_id))
            })?;
        self.repo
            .update_assignment_settings(assignment_id, &desired.settings)
            .await?;
        self.repo
            .record_author_if_missing(assignment_id, author_user_id)
            .await?;
        progress.step_completed("Assignment settings saved", SETTINGS_TARGET).await?;

        let field_units = self.assignment_units(assignment_id, &desired.settings);

        // Step 2: questions (skipped entirely when the desired list is empty)
        let outcome = if desired.questions.is_empty() {
            progress.set_total_translations(field_units.len());
            ReconcileOutcome::default()
        } else {
            progress.step_started("Updating questions", QUESTIONS_TARGET).await?;
            let outcome = self
                .reconciler
                .reconcile(assignment_id, &desired.questions)
                .await?;

            let question_units = self.question_units(assignment_id, &outcome.questions);
            progress.set_total_translations(question_units.len() + field_units.len());

            self.fan_out(progress, question_units).await?;
            progress.step_completed("Questions updated", QUESTIONS_TARGET).await?;
            outcome
        };

        // Step 3: assignment-level translations (always runs)
        progress
            .step_started("Translating assignment details", ASSIGNMENT_TRANSLATIONS_TARGET)
            .await?;
        self.fan_out(progress, field_units).await?;
        progress
            .step_completed("Assignment details translated", ASSIGNMENT_TRANSLATIONS_TARGET)
            .await?;

        // Step 4: finalize
        progress.step_started("Finalizing assignment", FINALIZE_TARGET).await?;

        let question_order: Vec<i64> = desired
            .questions
            .iter()
            .map(|q| outcome.id_remap.get(&q.id).copied().unwrap_or(q.id))
            .collect();

        let records: Vec<QuestionRecord> =
            outcome.questions.iter().map(|q| q.record.clone()).collect();
        let links = self.linker.compute(&records);
        for record in &records {
            if let Some(linked) = links.get(&record.id) {
                self.repo.set_grading_context(record.id, linked).await?;
            }
        }

        self.repo.finalize_assignment(assignment_id, &question_order).await?;
        progress.step_completed("Assignment published", FINALIZE_TARGET).await?;

        let payload = serde_json::to_string(&PublishResult {
            questions: outcome.questions,
        })
        .map_err(|e| PublishError::Persistence(e.to_string()))?;

        Ok(payload)
    }

    /// Resolve translation units concurrently, failing fast on the first
    /// error. Fan-out is as wide as the group list; the limiter inside the
    /// engine is what bounds provider traffic.
    ///
    /// Units sharing source content and target language run sequentially
    /// within one group, so the first resolution seeds the reuse lookup for
    /// the rest and the provider is called at most once per content per
    /// language.
    async fn fan_out(
        &self,
        progress: &ProgressTracker,
        units: Vec<TranslationUnit>,
    ) -> Result<(), PublishError> {
        if units.is_empty() {
            return Ok(());
        }

        let mut groups: HashMap<(String, String), Vec<TranslationUnit>> = HashMap::new();
        for unit in units {
            let hash = content_hash(&unit.text, unit.choices.as_deref().unwrap_or(&[]));
            groups
                .entry((hash, unit.language_code.clone()))
                .or_default()
                .push(unit);
        }

        let width = groups.len();
        let mut resolutions = stream::iter(groups.into_values())
            .map(|group| async move {
                for unit in &group {
                    self.engine.translate(unit).await?;
                    progress
                        .translation_finished(&format!(
                            "Translating content into {}",
                            unit.language_code
                        ))
                        .await?;
                }
                Ok::<(), PublishError>(())
            })
            .buffer_unordered(width);

        while let Some(resolution) = resolutions.next().await {
            resolution?;
        }

        Ok(())
    }

    /// Translation units for the reconciled questions and their variants,
    /// one per (entity, language)
    fn question_units(
        &self,
        assignment_id: i64,
        questions: &[ReconciledQuestion],
    ) -> Vec<TranslationUnit> {
        let mut units = Vec::new();

        for question in questions {
            for language in &self.languages {
                units.push(TranslationUnit {
                    assignment_id,
                    owner: TranslationOwner::Question {
                        question_id: question.record.id,
                    },
                    text: question.record.text.clone(),
                    choices: (!question.record.choices.is_empty())
                        .then(|| question.record.choices.clone()),
                    language_code: language.clone(),
                    context: "question text",
                });

                for variant in &question.variants {
                    units.push(TranslationUnit {
                        assignment_id,
                        owner: TranslationOwner::Variant {
                            question_id: question.record.id,
                            variant_id: variant.id,
                        },
                        text: variant.text.clone(),
                        choices: (!variant.choices.is_empty()).then(|| variant.choices.clone()),
                        language_code: language.clone(),
                        context: "question variant text",
                    });
                }
            }
        }

        units
    }

    /// Translation units for the assignment-level fields that carry text
    fn assignment_units(
        &self,
        assignment_id: i64,
        settings: &AssignmentSettings,
    ) -> Vec<TranslationUnit> {
        let fields: [(AssignmentField, Option<&String>, &'static str); 4] = [
            (AssignmentField::Name, Some(&settings.name), "assignment name"),
            (
                AssignmentField::Introduction,
                settings.introduction.as_ref(),
                "assignment introduction",
            ),
            (
                AssignmentField::Instructions,
                settings.instructions.as_ref(),
                "assignment instructions",
            ),
            (
                AssignmentField::GradingCriteriaOverview,
                settings.grading_criteria_overview.as_ref(),
                "grading criteria overview",
            ),
        ];

        let mut units = Vec::new();
        for (field, text, context) in fields {
            let Some(text) = text else { continue };
            if text.trim().is_empty() {
                continue;
            }

            for language in &self.languages {
                units.push(TranslationUnit {
                    assignment_id,
                    owner: TranslationOwner::Field(field),
                    text: text.clone(),
                    choices: None,
                    language_code: language.clone(),
                    context,
                });
            }
        }

        units
    }
}
