/*!
 * Mock collaborator implementations for testing.
 *
 * This module provides mocks that simulate different behaviors:
 * - `MockTranslator::working()` - Always succeeds with translated text
 * - `MockTranslator::intermittent(n)` - Fails every nth request
 * - `MockTranslator::failing()` - Always fails with an error
 * - `MockDetector` - Scripted language detection
 * - `MockGate` - Allow-all or deny-matching moderation
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::database::models::Choice;
use crate::errors::ProviderError;
use crate::language_utils::UNKNOWN_LANGUAGE;
use crate::providers::{LanguageDetector, ModerationGate, TranslationProvider};

/// Behavior mode for the mock translator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a deterministic translation
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns one fewer choice than the source (for invariant testing)
    DroppedChoice,
    /// Simulates slow response (for concurrency testing)
    Slow { delay_ms: u64 },
}

/// Mock translation provider with a deterministic output format:
/// `[lang] source text`
#[derive(Debug)]
pub struct MockTranslator {
    /// Behavior mode
    behavior: MockBehavior,
    /// Count of provider invocations (text and choices calls both count)
    call_count: Arc<AtomicUsize>,
}

impl MockTranslator {
    /// Create a new mock translator with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a working mock translator that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock translator
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock translator that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that drops a choice from every translation
    pub fn dropped_choice() -> Self {
        Self::new(MockBehavior::DroppedChoice)
    }

    /// Create a slow mock translator
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Number of provider invocations so far
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Shared handle to the call counter, for assertions after moving
    /// the mock into a service
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.call_count.clone()
    }

    /// The deterministic translation the working mock produces
    pub fn expected_translation(text: &str, target_language: &str) -> String {
        format!("[{}] {}", target_language, text)
    }

    async fn admit(&self) -> Result<(), ProviderError> {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;

        match self.behavior {
            MockBehavior::Working | MockBehavior::DroppedChoice => Ok(()),
            MockBehavior::Failing => Err(ProviderError::RequestFailed(
                "Mock provider failure".to_string(),
            )),
            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == 0 {
                    Err(ProviderError::RequestFailed(format!(
                        "Mock intermittent failure on call {}",
                        count
                    )))
                } else {
                    Ok(())
                }
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl TranslationProvider for MockTranslator {
    async fn translate_text(
        &self,
        text: &str,
        target_language: &str,
        _context: &str,
    ) -> Result<String, ProviderError> {
        self.admit().await?;
        Ok(Self::expected_translation(text, target_language))
    }

    async fn translate_choices(
        &self,
        choices: &[Choice],
        target_language: &str,
        _context: &str,
    ) -> Result<Vec<Choice>, ProviderError> {
        self.admit().await?;

        let mut translated: Vec<Choice> = choices
            .iter()
            .map(|c| Choice::new(Self::expected_translation(&c.text, target_language), c.is_correct))
            .collect();

        if self.behavior == MockBehavior::DroppedChoice {
            translated.pop();
        }

        Ok(translated)
    }
}

/// Mock language detector that always reports the configured code
#[derive(Debug)]
pub struct MockDetector {
    /// Code returned for every detection
    code: String,
}

impl MockDetector {
    /// Create a detector that always reports the given language
    pub fn fixed(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    /// Create a detector that never identifies a language
    pub fn unknown() -> Self {
        Self::fixed(UNKNOWN_LANGUAGE)
    }
}

#[async_trait]
impl LanguageDetector for MockDetector {
    async fn detect(&self, _text: &str) -> Result<String, ProviderError> {
        Ok(self.code.clone())
    }
}

/// Mock moderation gate
#[derive(Debug)]
pub struct MockGate {
    /// Substring that triggers rejection, if any
    deny_containing: Option<String>,
    /// Count of validations performed
    call_count: Arc<AtomicUsize>,
}

impl MockGate {
    /// Create a gate that accepts everything
    pub fn allow_all() -> Self {
        Self {
            deny_containing: None,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a gate that rejects content containing the given substring
    pub fn deny_containing(needle: impl Into<String>) -> Self {
        Self {
            deny_containing: Some(needle.into()),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of validations performed so far
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Shared handle to the call counter
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.call_count.clone()
    }
}

#[async_trait]
impl ModerationGate for MockGate {
    async fn validate(&self, content: &str) -> Result<bool, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        match &self.deny_containing {
            Some(needle) => Ok(!content.contains(needle.as_str())),
            None => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mockTranslator_working_shouldProduceDeterministicOutput() {
        let translator = MockTranslator::working();

        let result = translator.translate_text("Hello", "fr", "question text").await.unwrap();

        assert_eq!(result, "[fr] Hello");
        assert_eq!(translator.calls(), 1);
    }

    #[tokio::test]
    async fn test_mockTranslator_failing_shouldAlwaysError() {
        let translator = MockTranslator::failing();

        assert!(translator.translate_text("Hello", "fr", "text").await.is_err());
    }

    #[tokio::test]
    async fn test_mockTranslator_intermittent_shouldFailEveryNth() {
        let translator = MockTranslator::intermittent(2);

        assert!(translator.translate_text("a", "fr", "text").await.is_ok());
        assert!(translator.translate_text("b", "fr", "text").await.is_err());
        assert!(translator.translate_text("c", "fr", "text").await.is_ok());
    }

    #[tokio::test]
    async fn test_mockTranslator_droppedChoice_shouldReturnShortList() {
        let translator = MockTranslator::dropped_choice();
        let choices = vec![Choice::new("a", true), Choice::new("b", false)];

        let translated = translator.translate_choices(&choices, "fr", "choices").await.unwrap();

        assert_eq!(translated.len(), 1);
    }

    #[tokio::test]
    async fn test_mockGate_denyContaining_shouldRejectMatches() {
        let gate = MockGate::deny_containing("banned");

        assert!(gate.validate("innocent question").await.unwrap());
        assert!(!gate.validate("this is banned content").await.unwrap());
        assert_eq!(gate.calls(), 2);
    }
}
