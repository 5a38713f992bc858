/*!
 * Collaborator interfaces consumed by the publish pipeline.
 *
 * This module defines the external collaborators the pipeline depends on:
 * - `TranslationProvider`: text and structured-choice translation
 * - `LanguageDetector`: source language detection
 * - `ModerationGate`: approval check for changed question content
 * - `GradingContextLinker`: cross-question link computation at finalize
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;

use crate::database::models::{Choice, QuestionRecord};
use crate::errors::ProviderError;

/// Translation provider for text and structured choices
///
/// Implementations must preserve element count and order when translating
/// choices; the translation engine validates this invariant on every call.
#[async_trait]
pub trait TranslationProvider: Send + Sync + Debug {
    /// Translate plain text into the target language
    ///
    /// # Arguments
    /// * `text` - The source text to translate
    /// * `target_language` - ISO 639-1 code of the target language
    /// * `context` - Short description of what the text is (used for prompting)
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translated text or an error
    async fn translate_text(
        &self,
        text: &str,
        target_language: &str,
        context: &str,
    ) -> Result<String, ProviderError>;

    /// Translate an ordered list of choices into the target language
    async fn translate_choices(
        &self,
        choices: &[Choice],
        target_language: &str,
        context: &str,
    ) -> Result<Vec<Choice>, ProviderError>;
}

/// Language detector for source text
#[async_trait]
pub trait LanguageDetector: Send + Sync + Debug {
    /// Detect the language of the given text
    ///
    /// # Returns
    /// * ISO 639-1 code, or `"unknown"` when detection fails. Returning
    ///   `"unknown"` is not an error; the caller skips the entity.
    async fn detect(&self, text: &str) -> Result<String, ProviderError>;
}

/// Moderation gate applied to changed question content before persistence
#[async_trait]
pub trait ModerationGate: Send + Sync + Debug {
    /// Validate content, returning whether it is accepted
    async fn validate(&self, content: &str) -> Result<bool, ProviderError>;
}

/// Computes cross-question grading-context links from the final ordered
/// question set at finalize time
pub trait GradingContextLinker: Send + Sync {
    /// Compute the linked question ids for each question
    fn compute(&self, ordered_questions: &[QuestionRecord]) -> HashMap<i64, Vec<i64>>;
}

/// Default linker: each question is linked to every question that precedes
/// it in the published order, so graders see the earlier context.
#[derive(Debug, Default)]
pub struct SequentialContextLinker;

impl GradingContextLinker for SequentialContextLinker {
    fn compute(&self, ordered_questions: &[QuestionRecord]) -> HashMap<i64, Vec<i64>> {
        let mut links = HashMap::new();
        let mut seen: Vec<i64> = Vec::new();

        for question in ordered_questions {
            links.insert(question.id, seen.clone());
            seen.push(question.id);
        }

        links
    }
}

pub mod openai;
pub mod mock;
