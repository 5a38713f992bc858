/*!
 * The assignment publish pipeline.
 *
 * This module contains the components that take a submitted assignment tree
 * and publish it:
 * - `publish::limiter`: admission gate bounding concurrent provider calls
 * - `publish::progress`: monotonic percentage tracking on the job record
 * - `publish::reconcile`: diffing desired vs. persisted question trees
 * - `publish::translate`: per-entity translation with reuse and identity shortcuts
 * - `publish::orchestrator`: the sequential step state machine
 * - `publish::service`: the public publish/poll operations
 */

use serde::{Deserialize, Serialize};

use crate::database::models::{AssignmentSettings, Choice, QuestionType, ScoringSpec, VariantKind};

pub mod limiter;
pub mod progress;
pub mod reconcile;
pub mod translate;
pub mod orchestrator;
pub mod service;

pub use orchestrator::PublishPipeline;
pub use service::{JobStatusView, PublishReceipt, PublishService};

/// The desired assignment state submitted by the caller.
///
/// Question ids may be persisted integers or caller-chosen provisional values
/// (conventionally negative) for entities that do not exist yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredState {
    /// Scalar assignment settings
    pub settings: AssignmentSettings,
    /// Ordered list of desired questions
    #[serde(default)]
    pub questions: Vec<DesiredQuestion>,
}

/// A desired question within the submitted state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredQuestion {
    /// Persisted id, or a provisional id for a new question
    pub id: i64,
    /// Question text
    pub text: String,
    /// Question type
    pub question_type: QuestionType,
    /// Ordered answer choices
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Scoring specification
    #[serde(default)]
    pub scoring: ScoringSpec,
    /// Point value
    pub points: f64,
    /// Nested desired variants
    #[serde(default)]
    pub variants: Vec<DesiredVariant>,
}

/// A desired variant within a desired question.
///
/// Variants carry no id; incoming ids for new variants are not stable, so
/// matching against persisted variants is done by content hash instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredVariant {
    /// Variant content text
    pub text: String,
    /// Ordered answer choices
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Variant kind
    pub kind: VariantKind,
}
