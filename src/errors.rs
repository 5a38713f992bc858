/*!
 * Error types for the classpub application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors that can occur when working with translation provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Provider returned a translated choice list whose length differs from the source
    #[error("Translated choices count mismatch: expected {expected}, got {actual}")]
    ChoiceCountMismatch {
        /// Number of source choices
        expected: usize,
        /// Number of translated choices returned
        actual: usize,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Errors that can occur during a publish run
#[derive(Error, Debug)]
pub enum PublishError {
    /// A required field was missing or invalid before any step ran
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The moderation gate rejected changed question content
    #[error("Moderation rejected content for question {question_id}")]
    ModerationRejected {
        /// Persisted id of the offending question
        question_id: i64,
    },

    /// Error from the translation provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the persistence layer
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The requested job does not exist
    #[error("Job not found: {0}")]
    JobNotFound(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the publish pipeline
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<rusqlite::Error> for PublishError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Persistence(error.to_string())
    }
}

impl From<anyhow::Error> for PublishError {
    fn from(error: anyhow::Error) -> Self {
        Self::Persistence(error.to_string())
    }
}
