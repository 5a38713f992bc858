use std::time::Duration;
use serde::{Serialize, Deserialize};
use async_trait::async_trait;
use reqwest::Client;
use log::{debug, error};

use crate::app_config::ProviderConfig;
use crate::database::models::Choice;
use crate::errors::ProviderError;
use crate::language_utils::{self, UNKNOWN_LANGUAGE};
use crate::providers::{LanguageDetector, ModerationGate, TranslationProvider};

/// Client for an OpenAI-compatible chat completions endpoint
///
/// Used in real deployments for translation, language detection, and
/// moderation. Tests use the mocks in `providers::mock` instead.
#[derive(Debug)]
pub struct OpenAIClient {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL
    endpoint: String,
    /// Model name
    model: String,
    /// Sampling temperature
    temperature: f32,
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<ChatMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Chat message format
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    role: String,

    /// Content of the message
    content: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    /// The generated completions
    choices: Vec<ChatChoice>,
}

/// Individual completion in a chat response
#[derive(Debug, Deserialize)]
struct ChatChoice {
    /// The generated message
    message: ChatMessage,
}

impl OpenAIClient {
    /// Create a new client from provider configuration
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    /// Send a chat completion request and return the assistant text
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let api_url = format!(
            "{}/chat/completions",
            self.endpoint.trim_end_matches('/')
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: Some(self.temperature),
        };

        let response = self
            .client
            .post(&api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Chat API error ({}): {}", status, error_text);
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let chat_response = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let content = chat_response
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| ProviderError::ParseError("Empty completion response".to_string()))?;

        Ok(content)
    }
}

#[async_trait]
impl TranslationProvider for OpenAIClient {
    async fn translate_text(
        &self,
        text: &str,
        target_language: &str,
        context: &str,
    ) -> Result<String, ProviderError> {
        let language_name =
            language_utils::get_language_name(target_language).unwrap_or_else(|_| target_language.to_string());

        let system = format!(
            "You are a professional translator for educational content. \
             Translate the following {} into {}. \
             Preserve formatting, line breaks, and mathematical notation. \
             Only respond with the translated text, without any explanations or notes.",
            context, language_name
        );

        self.complete(&system, text).await
    }

    async fn translate_choices(
        &self,
        choices: &[Choice],
        target_language: &str,
        context: &str,
    ) -> Result<Vec<Choice>, ProviderError> {
        let language_name =
            language_utils::get_language_name(target_language).unwrap_or_else(|_| target_language.to_string());

        let texts: Vec<&str> = choices.iter().map(|c| c.text.as_str()).collect();
        let payload = serde_json::to_string(&texts)
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let system = format!(
            "You are a professional translator for educational content. \
             The user sends a JSON array of answer choices for {}. \
             Translate each element into {} and respond with a JSON array of \
             the same length, in the same order, and nothing else.",
            context, language_name
        );

        let raw = self.complete(&system, &payload).await?;

        let translated_texts: Vec<String> = serde_json::from_str(raw.trim())
            .map_err(|e| ProviderError::ParseError(format!("Invalid choices JSON: {}", e)))?;

        if translated_texts.len() != choices.len() {
            return Err(ProviderError::ChoiceCountMismatch {
                expected: choices.len(),
                actual: translated_texts.len(),
            });
        }

        // Correctness flags carry over from the source choices
        let translated = choices
            .iter()
            .zip(translated_texts)
            .map(|(source, text)| Choice::new(text, source.is_correct))
            .collect();

        Ok(translated)
    }
}

#[async_trait]
impl LanguageDetector for OpenAIClient {
    async fn detect(&self, text: &str) -> Result<String, ProviderError> {
        let system = "Identify the language of the user's text. \
                      Respond with only the ISO 639-1 two-letter code \
                      (for example: en, fr, es). If you cannot determine \
                      the language, respond with exactly: unknown";

        let raw = self.complete(system, text).await?;

        match language_utils::normalize_language_code(&raw) {
            Ok(code) => Ok(code),
            Err(_) => {
                debug!("Unparseable language detection response: {}", raw);
                Ok(UNKNOWN_LANGUAGE.to_string())
            }
        }
    }
}

#[async_trait]
impl ModerationGate for OpenAIClient {
    async fn validate(&self, content: &str) -> Result<bool, ProviderError> {
        let system = "You review question text for a school assignment platform. \
                      Respond with exactly ACCEPT if the content is appropriate \
                      coursework, or REJECT if it is offensive, harmful, or \
                      clearly unrelated to education.";

        let raw = self.complete(system, content).await?;

        Ok(raw.trim().eq_ignore_ascii_case("ACCEPT"))
    }
}
