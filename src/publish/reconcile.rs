/*!
 * Reconciliation of the desired question tree against persisted state.
 *
 * The desired list is authoritative: persisted questions absent from it are
 * soft-deleted, matched questions are updated in place, and unmatched
 * desired questions are created. Variants have no stable incoming ids, so
 * they are matched to persisted rows by content hash instead.
 */

use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::database::models::{content_hash, QuestionRecord, VariantRecord};
use crate::database::Repository;
use crate::errors::PublishError;
use crate::providers::ModerationGate;
use crate::publish::{DesiredQuestion, DesiredVariant};

/// A question after reconciliation, with its persisted id and active variants
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReconciledQuestion {
    /// The persisted question record
    pub record: QuestionRecord,
    /// Active variants, desired order
    pub variants: Vec<VariantRecord>,
}

/// Result of reconciling one desired tree
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// Maps every desired question id (provisional or persisted) to its
    /// persisted id
    pub id_remap: HashMap<i64, i64>,
    /// Final active questions, in desired order
    pub questions: Vec<ReconciledQuestion>,
}

/// Diffs a desired question tree against persisted state and applies
/// the changes
pub struct ReconciliationEngine {
    /// Repository for question and variant writes
    repo: Repository,
    /// Gate consulted before committing new or changed question text
    gate: Arc<dyn ModerationGate>,
}

impl ReconciliationEngine {
    /// Create a new reconciliation engine
    pub fn new(repo: Repository, gate: Arc<dyn ModerationGate>) -> Self {
        Self { repo, gate }
    }

    /// Reconcile the desired questions of an assignment against its
    /// persisted rows.
    ///
    /// A moderation rejection aborts the whole run; earlier writes within
    /// the run are left in place, the job simply reports the failure.
    pub async fn reconcile(
        &self,
        assignment_id: i64,
        desired: &[DesiredQuestion],
    ) -> Result<ReconcileOutcome, PublishError> {
        let persisted = self.repo.get_active_questions(assignment_id).await?;
        let persisted_by_id: HashMap<i64, QuestionRecord> =
            persisted.iter().map(|q| (q.id, q.clone())).collect();

        // Desired list is authoritative: anything persisted but absent is
        // soft-deleted. Its variants keep their rows.
        let desired_ids: HashSet<i64> = desired.iter().map(|q| q.id).collect();
        let mut removed = 0usize;
        for question in &persisted {
            if !desired_ids.contains(&question.id) {
                debug!("Soft-deleting question {} (absent from desired state)", question.id);
                self.repo.soft_delete_question(question.id).await?;
                removed += 1;
            }
        }

        let mut outcome = ReconcileOutcome::default();

        for wanted in desired {
            let record = match persisted_by_id.get(&wanted.id) {
                Some(existing) => self.update_existing(existing, wanted).await?,
                None => self.create_new(assignment_id, wanted).await?,
            };

            outcome.id_remap.insert(wanted.id, record.id);

            let variants = self.reconcile_variants(record.id, &wanted.variants).await?;
            outcome.questions.push(ReconciledQuestion { record, variants });
        }

        info!(
            "Reconciled assignment {}: {} active questions, {} removed",
            assignment_id,
            outcome.questions.len(),
            removed
        );

        Ok(outcome)
    }

    /// Update a matched persisted question in place.
    ///
    /// The moderation gate only runs when the text actually changed, so
    /// republishing untouched questions costs no provider calls.
    async fn update_existing(
        &self,
        existing: &QuestionRecord,
        wanted: &DesiredQuestion,
    ) -> Result<QuestionRecord, PublishError> {
        let wanted_text = wanted.text.trim();
        let text_changed = wanted_text != existing.text.trim();

        if text_changed {
            self.moderate(existing.id, wanted_text).await?;
        }

        let mut record = existing.clone();
        record.text = wanted_text.to_string();
        record.question_type = wanted.question_type;
        record.choices = wanted.choices.clone();
        record.scoring = wanted.scoring.clone();
        record.points = wanted.points;

        let changed = text_changed
            || record.question_type != existing.question_type
            || record.choices != existing.choices
            || record.scoring != existing.scoring
            || record.points != existing.points;

        if changed {
            self.repo.update_question(&record).await?;
        }

        Ok(record)
    }

    /// Create a question for a desired entry with a provisional id
    async fn create_new(
        &self,
        assignment_id: i64,
        wanted: &DesiredQuestion,
    ) -> Result<QuestionRecord, PublishError> {
        let wanted_text = wanted.text.trim();
        self.moderate(wanted.id, wanted_text).await?;

        let mut record = QuestionRecord::new(
            assignment_id,
            wanted_text,
            wanted.question_type,
            wanted.choices.clone(),
            wanted.scoring.clone(),
            wanted.points,
        );
        record.id = self.repo.insert_question(&record).await?;

        debug!("Created question {} for provisional id {}", record.id, wanted.id);

        Ok(record)
    }

    async fn moderate(&self, question_id: i64, text: &str) -> Result<(), PublishError> {
        if self.gate.validate(text).await? {
            Ok(())
        } else {
            Err(PublishError::ModerationRejected { question_id })
        }
    }

    /// Reconcile the variants of one question by content hash.
    ///
    /// A desired variant whose hash matches a persisted row is the same
    /// variant (possibly with a new kind); anything unmatched on the
    /// persisted side is soft-deleted, anything unmatched on the desired
    /// side is created.
    async fn reconcile_variants(
        &self,
        question_id: i64,
        desired: &[DesiredVariant],
    ) -> Result<Vec<VariantRecord>, PublishError> {
        let persisted = self.repo.get_active_variants(question_id).await?;
        let mut claimed: HashSet<i64> = HashSet::new();
        let mut result = Vec::with_capacity(desired.len());

        for wanted in desired {
            let hash = content_hash(&wanted.text, &wanted.choices);

            let matched = persisted
                .iter()
                .find(|v| v.content_hash == hash && !claimed.contains(&v.id));

            match matched {
                Some(existing) => {
                    claimed.insert(existing.id);
                    let mut record = existing.clone();
                    if record.kind != wanted.kind {
                        record.kind = wanted.kind;
                        self.repo.update_variant(&record).await?;
                    }
                    result.push(record);
                }
                None => {
                    let mut record = VariantRecord::new(
                        question_id,
                        wanted.text.trim(),
                        wanted.choices.clone(),
                        wanted.kind,
                    );
                    record.id = self.repo.insert_variant(&record).await?;
                    result.push(record);
                }
            }
        }

        for variant in &persisted {
            if !claimed.contains(&variant.id) {
                debug!("Soft-deleting variant {} (absent from desired state)", variant.id);
                self.repo.soft_delete_variant(variant.id).await?;
            }
        }

        Ok(result)
    }
}
