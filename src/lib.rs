/*!
 * # classpub - assignment publish pipeline
 *
 * A Rust library for publishing classroom assignments: reconciling a
 * submitted question tree against persisted state, translating content into
 * every configured language, and tracking the run on a pollable job record.
 *
 * ## Features
 *
 * - Soft-delete reconciliation of questions and content-hash matching of
 *   variants, with provisional-id remapping for new entities
 * - AI-backed translation with cross-entity reuse and an identity shortcut
 *   for content already in the target language
 * - Bounded provider concurrency over a FIFO admission gate
 * - Monotonic publish progress on a job record polled by callers
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `database`: SQLite persistence (assignments, questions, variants,
 *   translations, jobs)
 * - `providers`: Collaborator interfaces and the OpenAI-compatible client,
 *   plus mocks for testing
 * - `publish`: The publish pipeline:
 *   - `publish::reconcile`: desired-vs-persisted diffing
 *   - `publish::translate`: per-entity translation units
 *   - `publish::limiter`: provider-call admission gate
 *   - `publish::progress`: monotonic job progress
 *   - `publish::orchestrator`: the sequential step state machine
 *   - `publish::service`: publish/poll entry points
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod language_utils;
pub mod providers;
pub mod publish;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::Config;
pub use database::{DatabaseConnection, Repository};
pub use language_utils::{get_language_name, language_codes_match, normalize_language_code};
pub use publish::{DesiredState, PublishService};
pub use errors::{AppError, ProviderError, PublishError};
