/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Publish job status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job record created, pipeline not yet started
    Pending,
    /// Pipeline is running
    InProgress,
    /// All steps completed successfully
    Completed,
    /// A step failed; later steps were skipped
    Failed,
}

impl JobStatus {
    /// Whether this status is terminal (never mutated again)
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::InProgress => write!(f, "in_progress"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Question type enumeration (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Single correct choice
    MultipleChoice,
    /// Several correct choices
    MultipleSelect,
    /// True/false
    TrueFalse,
    /// Short free-text answer
    ShortAnswer,
    /// Long free-text answer
    Essay,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple_choice"),
            QuestionType::MultipleSelect => write!(f, "multiple_select"),
            QuestionType::TrueFalse => write!(f, "true_false"),
            QuestionType::ShortAnswer => write!(f, "short_answer"),
            QuestionType::Essay => write!(f, "essay"),
        }
    }
}

impl std::str::FromStr for QuestionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "multiple_select" => Ok(QuestionType::MultipleSelect),
            "true_false" => Ok(QuestionType::TrueFalse),
            "short_answer" => Ok(QuestionType::ShortAnswer),
            "essay" => Ok(QuestionType::Essay),
            _ => Err(anyhow::anyhow!("Invalid question type: {}", s)),
        }
    }
}

/// Variant kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    /// Same question, different wording
    Reworded,
    /// Easier formulation of the question
    Simplified,
    /// Harder formulation of the question
    Challenge,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKind::Reworded => write!(f, "reworded"),
            VariantKind::Simplified => write!(f, "simplified"),
            VariantKind::Challenge => write!(f, "challenge"),
        }
    }
}

impl std::str::FromStr for VariantKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reworded" => Ok(VariantKind::Reworded),
            "simplified" => Ok(VariantKind::Simplified),
            "challenge" => Ok(VariantKind::Challenge),
            _ => Err(anyhow::anyhow!("Invalid variant kind: {}", s)),
        }
    }
}

/// A single answer choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Display text of the choice
    pub text: String,
    /// Whether this choice is a correct answer
    #[serde(default)]
    pub is_correct: bool,
}

impl Choice {
    /// Create a new choice
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            text: text.into(),
            is_correct,
        }
    }
}

/// Scoring specification for a question (closed set)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScoringSpec {
    /// Correctness derived from choice flags
    PerChoice,
    /// Graded against a rubric of weighted criteria
    Rubric {
        /// Criteria the grader scores against
        criteria: Vec<RubricCriterion>,
    },
    /// Graded by hand, no automatic scoring
    Manual,
}

impl Default for ScoringSpec {
    fn default() -> Self {
        ScoringSpec::PerChoice
    }
}

/// A single rubric criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricCriterion {
    /// What the grader looks for
    pub description: String,
    /// Points awarded when met
    pub points: f64,
}

/// Display options for an assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayOptions {
    /// Whether point values are shown to students
    #[serde(default = "default_true")]
    pub show_points: bool,
    /// Whether question order is shuffled per attempt
    #[serde(default)]
    pub shuffle_questions: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_points: true,
            shuffle_questions: false,
        }
    }
}

/// Scalar assignment settings as submitted by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSettings {
    /// Assignment name
    pub name: String,
    /// Introduction shown before the first question (required to publish)
    pub introduction: Option<String>,
    /// Instructions for students
    pub instructions: Option<String>,
    /// Overview of the grading criteria
    pub grading_criteria_overview: Option<String>,
    /// Time limit in minutes, if any
    pub time_limit_minutes: Option<i64>,
    /// Maximum number of attempts, if limited
    pub attempt_limit: Option<i64>,
    /// Display options
    #[serde(default)]
    pub display_options: DisplayOptions,
}

/// Assignment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRecord {
    /// Database ID
    pub id: i64,
    /// Assignment name
    pub name: String,
    /// Introduction shown before the first question (required to publish)
    pub introduction: Option<String>,
    /// Instructions for students
    pub instructions: Option<String>,
    /// Overview of the grading criteria
    pub grading_criteria_overview: Option<String>,
    /// Time limit in minutes, if any
    pub time_limit_minutes: Option<i64>,
    /// Maximum number of attempts, if limited
    pub attempt_limit: Option<i64>,
    /// Display options
    pub display_options: DisplayOptions,
    /// Whether the assignment has been published
    pub published: bool,
    /// Canonical ordered list of question ids
    pub question_order: Vec<i64>,
    /// User who first published the assignment
    pub author_user_id: Option<String>,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
    /// Last update timestamp (ISO 8601)
    pub updated_at: String,
}

impl AssignmentRecord {
    /// Create a new unpublished assignment record
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: 0, // Will be assigned by database
            name: name.into(),
            introduction: None,
            instructions: None,
            grading_criteria_overview: None,
            time_limit_minutes: None,
            attempt_limit: None,
            display_options: DisplayOptions::default(),
            published: false,
            question_order: Vec::new(),
            author_user_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Question record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// Database ID (stable once persisted)
    pub id: i64,
    /// Assignment this question belongs to
    pub assignment_id: i64,
    /// Question text
    pub text: String,
    /// Question type
    pub question_type: QuestionType,
    /// Ordered answer choices
    pub choices: Vec<Choice>,
    /// Scoring specification
    pub scoring: ScoringSpec,
    /// Point value
    pub points: f64,
    /// Soft-delete flag; questions are never hard-deleted
    pub is_deleted: bool,
    /// Ids of related questions, recomputed at finalize
    pub grading_context: Vec<i64>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl QuestionRecord {
    /// Create a new question record (without database ID)
    pub fn new(
        assignment_id: i64,
        text: impl Into<String>,
        question_type: QuestionType,
        choices: Vec<Choice>,
        scoring: ScoringSpec,
        points: f64,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: 0, // Will be assigned by database
            assignment_id,
            text: text.into(),
            question_type,
            choices,
            scoring,
            points,
            is_deleted: false,
            grading_context: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Variant record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantRecord {
    /// Database ID (surrogate, stable once persisted)
    pub id: i64,
    /// Question this variant belongs to
    pub question_id: i64,
    /// Variant content text
    pub text: String,
    /// Ordered answer choices
    pub choices: Vec<Choice>,
    /// Variant kind
    pub kind: VariantKind,
    /// SHA-256 of trimmed content + choices, used for matching
    pub content_hash: String,
    /// Soft-delete flag
    pub is_deleted: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl VariantRecord {
    /// Create a new variant record (without database ID)
    pub fn new(
        question_id: i64,
        text: impl Into<String>,
        choices: Vec<Choice>,
        kind: VariantKind,
    ) -> Self {
        let text = text.into();
        let now = chrono::Utc::now().to_rfc3339();
        let content_hash = content_hash(&text, &choices);
        Self {
            id: 0, // Will be assigned by database
            question_id,
            text,
            choices,
            kind,
            content_hash,
            is_deleted: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Assignment-level field a translation row can cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentField {
    /// Assignment name
    Name,
    /// Introduction
    Introduction,
    /// Instructions
    Instructions,
    /// Grading criteria overview
    GradingCriteriaOverview,
}

impl AssignmentField {
    /// All translatable assignment-level fields, in a stable order
    pub fn all() -> [AssignmentField; 4] {
        [
            AssignmentField::Name,
            AssignmentField::Introduction,
            AssignmentField::Instructions,
            AssignmentField::GradingCriteriaOverview,
        ]
    }
}

impl fmt::Display for AssignmentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentField::Name => write!(f, "name"),
            AssignmentField::Introduction => write!(f, "introduction"),
            AssignmentField::Instructions => write!(f, "instructions"),
            AssignmentField::GradingCriteriaOverview => write!(f, "grading_criteria_overview"),
        }
    }
}

impl std::str::FromStr for AssignmentField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(AssignmentField::Name),
            "introduction" => Ok(AssignmentField::Introduction),
            "instructions" => Ok(AssignmentField::Instructions),
            "grading_criteria_overview" => Ok(AssignmentField::GradingCriteriaOverview),
            _ => Err(anyhow::anyhow!("Invalid assignment field: {}", s)),
        }
    }
}

/// Translation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRecord {
    /// Database ID
    pub id: i64,
    /// Assignment the owning entity belongs to
    pub assignment_id: i64,
    /// Owning question, if question- or variant-level
    pub question_id: Option<i64>,
    /// Owning variant, if variant-level
    pub variant_id: Option<i64>,
    /// Assignment-level field, if assignment-level
    pub field: Option<AssignmentField>,
    /// Target language code (ISO 639-1)
    pub language_code: String,
    /// Source text (trimmed)
    pub source_text: String,
    /// Source choices, if the entity has choices
    pub source_choices: Option<Vec<Choice>>,
    /// Translated text
    pub translated_text: String,
    /// Translated choices, same count and order as source
    pub translated_choices: Option<Vec<Choice>>,
    /// SHA-256 of trimmed source text + choices, used for reuse lookups
    pub source_hash: String,
    /// Creation timestamp
    pub created_at: String,
}

impl TranslationRecord {
    /// Create a new translation record (without database ID)
    pub fn new(
        assignment_id: i64,
        question_id: Option<i64>,
        variant_id: Option<i64>,
        field: Option<AssignmentField>,
        language_code: impl Into<String>,
        source_text: impl Into<String>,
        source_choices: Option<Vec<Choice>>,
        translated_text: impl Into<String>,
        translated_choices: Option<Vec<Choice>>,
    ) -> Self {
        let source_text = source_text.into();
        let source_hash = content_hash(&source_text, source_choices.as_deref().unwrap_or(&[]));
        Self {
            id: 0, // Will be assigned by database
            assignment_id,
            question_id,
            variant_id,
            field,
            language_code: language_code.into(),
            source_text,
            source_choices,
            translated_text: translated_text.into(),
            translated_choices,
            source_hash,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Publish job record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job identifier (UUID)
    pub id: String,
    /// Assignment being published
    pub assignment_id: i64,
    /// Current job status
    pub status: JobStatus,
    /// Human-readable progress message
    pub progress_message: String,
    /// Progress percentage (0-100, non-decreasing within a run)
    pub percentage: i64,
    /// JSON result payload, present on Completed/Failed
    pub result: Option<String>,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
    /// Last update timestamp (ISO 8601)
    pub updated_at: String,
}

impl JobRecord {
    /// Create a new pending job record
    pub fn new(id: String, assignment_id: i64) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id,
            assignment_id,
            status: JobStatus::Pending,
            progress_message: "Publish queued".to_string(),
            percentage: 0,
            result: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Compute the SHA-256 content hash of trimmed text plus choices.
///
/// This is the natural key used for variant matching and translation
/// reuse lookups, so whitespace-only edits do not look like new content.
pub fn content_hash(text: &str, choices: &[Choice]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    for choice in choices {
        hasher.update([0u8]);
        hasher.update(choice.text.trim().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
