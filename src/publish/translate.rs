/*!
 * Per-entity translation with reuse and identity shortcuts.
 *
 * Each unit of work covers one (entity, target language) pair. The engine
 * tries the cheap paths first: a content-hash reuse lookup across all owners,
 * then the identity case when the source is already in the target language.
 * Only the remaining units reach the provider, and those calls run under the
 * admission limiter.
 */

use log::{debug, warn};
use std::sync::Arc;

use crate::database::models::{content_hash, AssignmentField, Choice, TranslationRecord};
use crate::database::Repository;
use crate::errors::{ProviderError, PublishError};
use crate::language_utils::{self, UNKNOWN_LANGUAGE};
use crate::providers::{LanguageDetector, TranslationProvider};
use crate::publish::limiter::TranslationLimiter;

/// The entity a translation unit is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationOwner {
    /// Question text and choices
    Question {
        /// Owning question id
        question_id: i64,
    },
    /// Variant content and choices
    Variant {
        /// Question the variant belongs to
        question_id: i64,
        /// Owning variant id
        variant_id: i64,
    },
    /// An assignment-level field; these rows are updated in place
    Field(AssignmentField),
}

/// One (entity, target language) unit of translation work
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    /// Assignment the owning entity belongs to
    pub assignment_id: i64,
    /// Owning entity
    pub owner: TranslationOwner,
    /// Source text
    pub text: String,
    /// Source choices, for entities that have them
    pub choices: Option<Vec<Choice>>,
    /// Target language code (ISO 639-1)
    pub language_code: String,
    /// Short description of the content, used for provider prompting
    pub context: &'static str,
}

/// How a translation unit was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationOutcome {
    /// Empty source or undetectable language; no row, no provider call
    Skipped,
    /// An existing translation was cloned for this owner
    Reused,
    /// Source already in the target language; no row needed
    Identity,
    /// The provider was called and a new row persisted
    Translated,
}

/// Resolves translation units against the reuse table, the identity
/// shortcut, and finally the provider
pub struct TranslationEngine {
    /// Repository for translation rows
    repo: Repository,
    /// Translation provider, called only for units with no shortcut
    provider: Arc<dyn TranslationProvider>,
    /// Source language detector
    detector: Arc<dyn LanguageDetector>,
    /// Admission gate for provider calls
    limiter: TranslationLimiter,
}

impl TranslationEngine {
    /// Create a new translation engine
    pub fn new(
        repo: Repository,
        provider: Arc<dyn TranslationProvider>,
        detector: Arc<dyn LanguageDetector>,
        limiter: TranslationLimiter,
    ) -> Self {
        Self {
            repo,
            provider,
            detector,
            limiter,
        }
    }

    /// Resolve one translation unit.
    ///
    /// An undetectable source language is a skip, not an error: the entity
    /// simply ships untranslated for that language.
    pub async fn translate(&self, unit: &TranslationUnit) -> Result<TranslationOutcome, PublishError> {
        let text = unit.text.trim();
        if text.is_empty() {
            debug!("Skipping empty source for {:?}", unit.owner);
            return Ok(TranslationOutcome::Skipped);
        }

        let detected = self.detect_language(text).await?;
        if detected == UNKNOWN_LANGUAGE {
            warn!(
                "Could not detect source language for {:?}; skipping {} translation",
                unit.owner, unit.language_code
            );
            return Ok(TranslationOutcome::Skipped);
        }

        let choices = unit.choices.as_deref().unwrap_or(&[]);
        let source_hash = content_hash(text, choices);

        if let Some(existing) = self
            .repo
            .find_reusable_translation(&unit.language_code, &source_hash)
            .await?
        {
            debug!(
                "Reusing translation {} for {:?} ({})",
                existing.id, unit.owner, unit.language_code
            );
            self.persist(unit, text, existing.translated_text, existing.translated_choices)
                .await?;
            return Ok(TranslationOutcome::Reused);
        }

        if language_utils::language_codes_match(&detected, &unit.language_code) {
            debug!(
                "Source for {:?} already in {}; no translation row needed",
                unit.owner, unit.language_code
            );
            return Ok(TranslationOutcome::Identity);
        }

        let (translated_text, translated_choices) = self
            .limiter
            .run(self.call_provider(unit, text))
            .await?;

        self.persist(unit, text, translated_text, translated_choices).await?;
        Ok(TranslationOutcome::Translated)
    }

    async fn detect_language(&self, text: &str) -> Result<String, ProviderError> {
        let raw = self.detector.detect(text).await?;
        Ok(language_utils::normalize_language_code(&raw)
            .unwrap_or_else(|_| UNKNOWN_LANGUAGE.to_string()))
    }

    /// Provider-facing section of a unit; runs under a limiter permit
    async fn call_provider(
        &self,
        unit: &TranslationUnit,
        text: &str,
    ) -> Result<(String, Option<Vec<Choice>>), ProviderError> {
        let translated_text = self
            .provider
            .translate_text(text, &unit.language_code, unit.context)
            .await?;

        let translated_choices = match &unit.choices {
            Some(choices) if !choices.is_empty() => {
                let translated = self
                    .provider
                    .translate_choices(choices, &unit.language_code, unit.context)
                    .await?;

                // Providers must preserve the choice list shape; a short or
                // long list would corrupt correctness flags downstream
                if translated.len() != choices.len() {
                    return Err(ProviderError::ChoiceCountMismatch {
                        expected: choices.len(),
                        actual: translated.len(),
                    });
                }
                Some(translated)
            }
            _ => None,
        };

        Ok((translated_text, translated_choices))
    }

    async fn persist(
        &self,
        unit: &TranslationUnit,
        source_text: &str,
        translated_text: String,
        translated_choices: Option<Vec<Choice>>,
    ) -> Result<(), PublishError> {
        let (question_id, variant_id, field) = match unit.owner {
            TranslationOwner::Question { question_id } => (Some(question_id), None, None),
            TranslationOwner::Variant {
                question_id,
                variant_id,
            } => (Some(question_id), Some(variant_id), None),
            TranslationOwner::Field(field) => (None, None, Some(field)),
        };

        let record = TranslationRecord::new(
            unit.assignment_id,
            question_id,
            variant_id,
            field,
            unit.language_code.clone(),
            source_text,
            unit.choices.clone().filter(|c| !c.is_empty()),
            translated_text,
            translated_choices,
        );

        match unit.owner {
            TranslationOwner::Field(_) => {
                self.repo.upsert_assignment_translation(&record).await?;
            }
            _ => {
                self.repo.insert_translation(&record).await?;
            }
        }

        Ok(())
    }
}
