/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::connection::DatabaseConnection;
use super::models::{
    AssignmentField, AssignmentRecord, AssignmentSettings, Choice, DisplayOptions, JobRecord,
    JobStatus, QuestionRecord, QuestionType, ScoringSpec, TranslationRecord, VariantKind,
    VariantRecord,
};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    // =========================================================================
    // Assignment Operations
    // =========================================================================

    /// Insert a new assignment, returning its assigned id
    pub async fn create_assignment(&self, assignment: &AssignmentRecord) -> Result<i64> {
        let assignment = assignment.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO assignments (
                        name, introduction, instructions, grading_criteria_overview,
                        time_limit_minutes, attempt_limit, display_options, published,
                        question_order, author_user_id, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                    "#,
                    params![
                        assignment.name,
                        assignment.introduction,
                        assignment.instructions,
                        assignment.grading_criteria_overview,
                        assignment.time_limit_minutes,
                        assignment.attempt_limit,
                        serde_json::to_string(&assignment.display_options)?,
                        assignment.published,
                        serde_json::to_string(&assignment.question_order)?,
                        assignment.author_user_id,
                        assignment.created_at,
                        assignment.updated_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    /// Get an assignment by id
    pub async fn get_assignment(&self, assignment_id: i64) -> Result<Option<AssignmentRecord>> {
        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        r#"
                        SELECT id, name, introduction, instructions, grading_criteria_overview,
                               time_limit_minutes, attempt_limit, display_options, published,
                               question_order, author_user_id, created_at, updated_at
                        FROM assignments WHERE id = ?1
                        "#,
                        [assignment_id],
                        map_assignment_row,
                    )
                    .optional()?;

                Ok(result)
            })
            .await
    }

    /// Update the scalar settings of an assignment
    pub async fn update_assignment_settings(
        &self,
        assignment_id: i64,
        settings: &AssignmentSettings,
    ) -> Result<()> {
        let settings = settings.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    UPDATE assignments
                    SET name = ?1, introduction = ?2, instructions = ?3,
                        grading_criteria_overview = ?4, time_limit_minutes = ?5,
                        attempt_limit = ?6, display_options = ?7, updated_at = ?8
                    WHERE id = ?9
                    "#,
                    params![
                        settings.name,
                        settings.introduction,
                        settings.instructions,
                        settings.grading_criteria_overview,
                        settings.time_limit_minutes,
                        settings.attempt_limit,
                        serde_json::to_string(&settings.display_options)?,
                        now,
                        assignment_id,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Record the publishing author, only if none is recorded yet
    pub async fn record_author_if_missing(
        &self,
        assignment_id: i64,
        author_user_id: &str,
    ) -> Result<()> {
        let author_user_id = author_user_id.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "UPDATE assignments SET author_user_id = ?1 WHERE id = ?2 AND author_user_id IS NULL",
                    params![author_user_id, assignment_id],
                )?;
                Ok(())
            })
            .await
    }

    /// Persist the final question order and mark the assignment published
    pub async fn finalize_assignment(
        &self,
        assignment_id: i64,
        question_order: &[i64],
    ) -> Result<()> {
        let order_json = serde_json::to_string(question_order)?;
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "UPDATE assignments SET question_order = ?1, published = 1, updated_at = ?2 WHERE id = ?3",
                    params![order_json, now, assignment_id],
                )?;
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Question Operations
    // =========================================================================

    /// Get all active (not soft-deleted) questions for an assignment
    pub async fn get_active_questions(&self, assignment_id: i64) -> Result<Vec<QuestionRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, assignment_id, question_text, question_type, choices, scoring,
                           points, is_deleted, grading_context, created_at, updated_at
                    FROM questions
                    WHERE assignment_id = ?1 AND is_deleted = 0
                    ORDER BY id
                    "#,
                )?;

                let questions = stmt
                    .query_map([assignment_id], map_question_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                Ok(questions)
            })
            .await
    }

    /// Insert a new question, returning its assigned id
    pub async fn insert_question(&self, question: &QuestionRecord) -> Result<i64> {
        let question = question.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO questions (
                        assignment_id, question_text, question_type, choices, scoring,
                        points, is_deleted, grading_context, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    "#,
                    params![
                        question.assignment_id,
                        question.text,
                        question.question_type.to_string(),
                        serde_json::to_string(&question.choices)?,
                        serde_json::to_string(&question.scoring)?,
                        question.points,
                        question.is_deleted,
                        serde_json::to_string(&question.grading_context)?,
                        question.created_at,
                        question.updated_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    /// Update the scalar fields of a question
    pub async fn update_question(&self, question: &QuestionRecord) -> Result<()> {
        let question = question.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    UPDATE questions
                    SET question_text = ?1, question_type = ?2, choices = ?3,
                        scoring = ?4, points = ?5, updated_at = ?6
                    WHERE id = ?7
                    "#,
                    params![
                        question.text,
                        question.question_type.to_string(),
                        serde_json::to_string(&question.choices)?,
                        serde_json::to_string(&question.scoring)?,
                        question.points,
                        now,
                        question.id,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Soft-delete a question
    pub async fn soft_delete_question(&self, question_id: i64) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "UPDATE questions SET is_deleted = 1, updated_at = ?1 WHERE id = ?2",
                    params![now, question_id],
                )?;
                Ok(())
            })
            .await
    }

    /// Replace the grading-context links of a question
    pub async fn set_grading_context(&self, question_id: i64, linked_ids: &[i64]) -> Result<()> {
        let links_json = serde_json::to_string(linked_ids)?;
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "UPDATE questions SET grading_context = ?1, updated_at = ?2 WHERE id = ?3",
                    params![links_json, now, question_id],
                )?;
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Variant Operations
    // =========================================================================

    /// Get all active (not soft-deleted) variants for a question
    pub async fn get_active_variants(&self, question_id: i64) -> Result<Vec<VariantRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, question_id, content_text, choices, kind, content_hash,
                           is_deleted, created_at, updated_at
                    FROM variants
                    WHERE question_id = ?1 AND is_deleted = 0
                    ORDER BY id
                    "#,
                )?;

                let variants = stmt
                    .query_map([question_id], map_variant_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                Ok(variants)
            })
            .await
    }

    /// Insert a new variant, returning its assigned id
    pub async fn insert_variant(&self, variant: &VariantRecord) -> Result<i64> {
        let variant = variant.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO variants (
                        question_id, content_text, choices, kind, content_hash,
                        is_deleted, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        variant.question_id,
                        variant.text,
                        serde_json::to_string(&variant.choices)?,
                        variant.kind.to_string(),
                        variant.content_hash,
                        variant.is_deleted,
                        variant.created_at,
                        variant.updated_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    /// Update a variant's content and kind
    pub async fn update_variant(&self, variant: &VariantRecord) -> Result<()> {
        let variant = variant.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    UPDATE variants
                    SET content_text = ?1, choices = ?2, kind = ?3, content_hash = ?4, updated_at = ?5
                    WHERE id = ?6
                    "#,
                    params![
                        variant.text,
                        serde_json::to_string(&variant.choices)?,
                        variant.kind.to_string(),
                        variant.content_hash,
                        now,
                        variant.id,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Soft-delete a variant
    pub async fn soft_delete_variant(&self, variant_id: i64) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "UPDATE variants SET is_deleted = 1, updated_at = ?1 WHERE id = ?2",
                    params![now, variant_id],
                )?;
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Translation Operations
    // =========================================================================

    /// Find an existing translation with matching target language and source
    /// content, regardless of which entity owns it
    pub async fn find_reusable_translation(
        &self,
        language_code: &str,
        source_hash: &str,
    ) -> Result<Option<TranslationRecord>> {
        let language_code = language_code.to_string();
        let source_hash = source_hash.to_string();

        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        r#"
                        SELECT id, assignment_id, question_id, variant_id, field, language_code,
                               source_text, source_choices, translated_text, translated_choices,
                               source_hash, created_at
                        FROM translations
                        WHERE language_code = ?1 AND source_hash = ?2
                        ORDER BY id
                        LIMIT 1
                        "#,
                        params![language_code, source_hash],
                        map_translation_row,
                    )
                    .optional()?;

                Ok(result)
            })
            .await
    }

    /// Insert a new translation row, returning its assigned id
    pub async fn insert_translation(&self, translation: &TranslationRecord) -> Result<i64> {
        let translation = translation.clone();

        self.db
            .execute_async(move |conn| {
                insert_translation_sync(conn, &translation)
            })
            .await
    }

    /// Insert or update an assignment-level translation row, keyed by
    /// (assignment, field, language). Question/variant rows are append-style;
    /// assignment-level rows are updated in place.
    pub async fn upsert_assignment_translation(
        &self,
        translation: &TranslationRecord,
    ) -> Result<i64> {
        let translation = translation.clone();

        self.db
            .execute_async(move |conn| {
                let field = translation
                    .field
                    .map(|f| f.to_string())
                    .ok_or_else(|| anyhow::anyhow!("Assignment-level translation requires a field"))?;

                let existing: Option<i64> = conn
                    .query_row(
                        r#"
                        SELECT id FROM translations
                        WHERE assignment_id = ?1 AND field = ?2 AND language_code = ?3
                          AND question_id IS NULL AND variant_id IS NULL
                        "#,
                        params![translation.assignment_id, field, translation.language_code],
                        |row| row.get(0),
                    )
                    .optional()?;

                match existing {
                    Some(id) => {
                        conn.execute(
                            r#"
                            UPDATE translations
                            SET source_text = ?1, source_choices = ?2, translated_text = ?3,
                                translated_choices = ?4, source_hash = ?5
                            WHERE id = ?6
                            "#,
                            params![
                                translation.source_text,
                                json_opt(&translation.source_choices)?,
                                translation.translated_text,
                                json_opt(&translation.translated_choices)?,
                                translation.source_hash,
                                id,
                            ],
                        )?;
                        Ok(id)
                    }
                    None => insert_translation_sync(conn, &translation),
                }
            })
            .await
    }

    /// List all translation rows for an assignment
    pub async fn list_translations(&self, assignment_id: i64) -> Result<Vec<TranslationRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, assignment_id, question_id, variant_id, field, language_code,
                           source_text, source_choices, translated_text, translated_choices,
                           source_hash, created_at
                    FROM translations
                    WHERE assignment_id = ?1
                    ORDER BY id
                    "#,
                )?;

                let translations = stmt
                    .query_map([assignment_id], map_translation_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                Ok(translations)
            })
            .await
    }

    // =========================================================================
    // Job Operations
    // =========================================================================

    /// Create a new publish job
    pub async fn create_job(&self, job: &JobRecord) -> Result<()> {
        let job = job.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO jobs (
                        id, assignment_id, status, progress_message, percentage,
                        result, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        job.id,
                        job.assignment_id,
                        job.status.to_string(),
                        job.progress_message,
                        job.percentage,
                        job.result,
                        job.created_at,
                        job.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Get a job by id
    pub async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        r#"
                        SELECT id, assignment_id, status, progress_message, percentage,
                               result, created_at, updated_at
                        FROM jobs WHERE id = ?1
                        "#,
                        [job_id],
                        map_job_row,
                    )
                    .optional()?;

                Ok(result)
            })
            .await
    }

    /// Update job status and progress message
    pub async fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        message: &str,
    ) -> Result<()> {
        let job_id = job_id.to_string();
        let message = message.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "UPDATE jobs SET status = ?1, progress_message = ?2, updated_at = ?3 WHERE id = ?4",
                    params![status.to_string(), message, now, job_id],
                )?;
                Ok(())
            })
            .await
    }

    /// Record a progress checkpoint. The percentage is written with a
    /// max-merge so concurrent reporters can never make it regress.
    pub async fn update_job_progress(
        &self,
        job_id: &str,
        message: &str,
        percentage: i64,
    ) -> Result<()> {
        let job_id = job_id.to_string();
        let message = message.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        debug!("Job {} progress: {}% - {}", &job_id[..8.min(job_id.len())], percentage, message);

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    UPDATE jobs
                    SET percentage = MAX(percentage, ?1), progress_message = ?2, updated_at = ?3
                    WHERE id = ?4
                    "#,
                    params![percentage, message, now, job_id],
                )?;
                Ok(())
            })
            .await
    }

    /// Move a job to a terminal state with its result payload
    pub async fn complete_job(
        &self,
        job_id: &str,
        status: JobStatus,
        message: &str,
        result: Option<String>,
    ) -> Result<()> {
        let job_id = job_id.to_string();
        let message = message.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let percentage_floor = if status == JobStatus::Completed { 100 } else { 0 };

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    UPDATE jobs
                    SET status = ?1, progress_message = ?2, percentage = MAX(percentage, ?3),
                        result = ?4, updated_at = ?5
                    WHERE id = ?6
                    "#,
                    params![
                        status.to_string(),
                        message,
                        percentage_floor,
                        result,
                        now,
                        job_id,
                    ],
                )?;
                Ok(())
            })
            .await
    }
}

// =========================================================================
// Row mapping helpers
// =========================================================================

fn map_assignment_row(row: &Row<'_>) -> rusqlite::Result<AssignmentRecord> {
    Ok(AssignmentRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        introduction: row.get(2)?,
        instructions: row.get(3)?,
        grading_criteria_overview: row.get(4)?,
        time_limit_minutes: row.get(5)?,
        attempt_limit: row.get(6)?,
        display_options: serde_json::from_str::<DisplayOptions>(&row.get::<_, String>(7)?)
            .unwrap_or_default(),
        published: row.get(8)?,
        question_order: serde_json::from_str(&row.get::<_, String>(9)?).unwrap_or_default(),
        author_user_id: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn map_question_row(row: &Row<'_>) -> rusqlite::Result<QuestionRecord> {
    Ok(QuestionRecord {
        id: row.get(0)?,
        assignment_id: row.get(1)?,
        text: row.get(2)?,
        question_type: row
            .get::<_, String>(3)?
            .parse()
            .unwrap_or(QuestionType::ShortAnswer),
        choices: serde_json::from_str::<Vec<Choice>>(&row.get::<_, String>(4)?).unwrap_or_default(),
        scoring: serde_json::from_str::<ScoringSpec>(&row.get::<_, String>(5)?).unwrap_or_default(),
        points: row.get(6)?,
        is_deleted: row.get(7)?,
        grading_context: serde_json::from_str(&row.get::<_, String>(8)?).unwrap_or_default(),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn map_variant_row(row: &Row<'_>) -> rusqlite::Result<VariantRecord> {
    Ok(VariantRecord {
        id: row.get(0)?,
        question_id: row.get(1)?,
        text: row.get(2)?,
        choices: serde_json::from_str::<Vec<Choice>>(&row.get::<_, String>(3)?).unwrap_or_default(),
        kind: row
            .get::<_, String>(4)?
            .parse()
            .unwrap_or(VariantKind::Reworded),
        content_hash: row.get(5)?,
        is_deleted: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_translation_row(row: &Row<'_>) -> rusqlite::Result<TranslationRecord> {
    Ok(TranslationRecord {
        id: row.get(0)?,
        assignment_id: row.get(1)?,
        question_id: row.get(2)?,
        variant_id: row.get(3)?,
        field: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| s.parse::<AssignmentField>().ok()),
        language_code: row.get(5)?,
        source_text: row.get(6)?,
        source_choices: row
            .get::<_, Option<String>>(7)?
            .and_then(|s| serde_json::from_str(&s).ok()),
        translated_text: row.get(8)?,
        translated_choices: row
            .get::<_, Option<String>>(9)?
            .and_then(|s| serde_json::from_str(&s).ok()),
        source_hash: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn map_job_row(row: &Row<'_>) -> rusqlite::Result<JobRecord> {
    Ok(JobRecord {
        id: row.get(0)?,
        assignment_id: row.get(1)?,
        status: row
            .get::<_, String>(2)?
            .parse()
            .unwrap_or(JobStatus::Pending),
        progress_message: row.get(3)?,
        percentage: row.get(4)?,
        result: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn insert_translation_sync(conn: &Connection, translation: &TranslationRecord) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO translations (
            assignment_id, question_id, variant_id, field, language_code,
            source_text, source_choices, translated_text, translated_choices,
            source_hash, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            translation.assignment_id,
            translation.question_id,
            translation.variant_id,
            translation.field.map(|f| f.to_string()),
            translation.language_code,
            translation.source_text,
            json_opt(&translation.source_choices)?,
            translation.translated_text,
            json_opt(&translation.translated_choices)?,
            translation.source_hash,
            translation.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn json_opt(choices: &Option<Vec<Choice>>) -> Result<Option<String>> {
    match choices {
        Some(c) => Ok(Some(serde_json::to_string(c)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::content_hash;

    async fn seeded_repo() -> (Repository, i64) {
        let repo = Repository::new_in_memory().unwrap();
        let assignment_id = repo
            .create_assignment(&AssignmentRecord::new("Algebra homework"))
            .await
            .unwrap();
        (repo, assignment_id)
    }

    #[tokio::test]
    async fn test_createAssignment_shouldRoundTrip() {
        let (repo, assignment_id) = seeded_repo().await;

        let assignment = repo.get_assignment(assignment_id).await.unwrap().unwrap();
        assert_eq!(assignment.name, "Algebra homework");
        assert!(!assignment.published);
        assert!(assignment.question_order.is_empty());
    }

    #[tokio::test]
    async fn test_recordAuthorIfMissing_shouldNotOverwrite() {
        let (repo, assignment_id) = seeded_repo().await;

        repo.record_author_if_missing(assignment_id, "user-1").await.unwrap();
        repo.record_author_if_missing(assignment_id, "user-2").await.unwrap();

        let assignment = repo.get_assignment(assignment_id).await.unwrap().unwrap();
        assert_eq!(assignment.author_user_id.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_softDeleteQuestion_shouldHideFromActiveQuery() {
        let (repo, assignment_id) = seeded_repo().await;

        let question = QuestionRecord::new(
            assignment_id,
            "What is 2+2?",
            QuestionType::MultipleChoice,
            vec![Choice::new("4", true), Choice::new("5", false)],
            ScoringSpec::PerChoice,
            1.0,
        );
        let question_id = repo.insert_question(&question).await.unwrap();

        assert_eq!(repo.get_active_questions(assignment_id).await.unwrap().len(), 1);

        repo.soft_delete_question(question_id).await.unwrap();
        assert!(repo.get_active_questions(assignment_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_findReusableTranslation_shouldMatchAcrossOwners() {
        let (repo, assignment_id) = seeded_repo().await;

        let question = QuestionRecord::new(
            assignment_id,
            "Shared text",
            QuestionType::ShortAnswer,
            Vec::new(),
            ScoringSpec::Manual,
            1.0,
        );
        let question_id = repo.insert_question(&question).await.unwrap();

        let row = TranslationRecord::new(
            assignment_id,
            Some(question_id),
            None,
            None,
            "fr",
            "Shared text",
            None,
            "Texte partagé",
            None,
        );
        repo.insert_translation(&row).await.unwrap();

        let hash = content_hash("Shared text", &[]);
        let found = repo.find_reusable_translation("fr", &hash).await.unwrap();
        assert_eq!(found.unwrap().translated_text, "Texte partagé");

        // Different language does not match
        assert!(repo.find_reusable_translation("es", &hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsertAssignmentTranslation_shouldUpdateInPlace() {
        let (repo, assignment_id) = seeded_repo().await;

        let first = TranslationRecord::new(
            assignment_id,
            None,
            None,
            Some(AssignmentField::Introduction),
            "fr",
            "Welcome",
            None,
            "Bienvenue",
            None,
        );
        let first_id = repo.upsert_assignment_translation(&first).await.unwrap();

        let second = TranslationRecord::new(
            assignment_id,
            None,
            None,
            Some(AssignmentField::Introduction),
            "fr",
            "Welcome back",
            None,
            "Bon retour",
            None,
        );
        let second_id = repo.upsert_assignment_translation(&second).await.unwrap();

        assert_eq!(first_id, second_id);

        let all = repo.list_translations(assignment_id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].translated_text, "Bon retour");
    }

    #[tokio::test]
    async fn test_updateJobProgress_shouldNeverRegress() {
        let (repo, assignment_id) = seeded_repo().await;

        let job = JobRecord::new("job-progress".to_string(), assignment_id);
        repo.create_job(&job).await.unwrap();

        repo.update_job_progress("job-progress", "halfway", 50).await.unwrap();
        repo.update_job_progress("job-progress", "late reporter", 30).await.unwrap();

        let job = repo.get_job("job-progress").await.unwrap().unwrap();
        assert_eq!(job.percentage, 50);
        assert_eq!(job.progress_message, "late reporter");
    }

    #[tokio::test]
    async fn test_completeJob_shouldStoreResultPayload() {
        let (repo, assignment_id) = seeded_repo().await;

        let job = JobRecord::new("job-done".to_string(), assignment_id);
        repo.create_job(&job).await.unwrap();

        repo.complete_job(
            "job-done",
            JobStatus::Completed,
            "Publish complete",
            Some("{\"questions\":[]}".to_string()),
        )
        .await
        .unwrap();

        let job = repo.get_job("job-done").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.percentage, 100);
        assert!(job.result.is_some());
    }
}
