/*!
 * Database module for persistent storage of assignments and publish jobs.
 *
 * This module provides SQLite-based persistence for:
 * - Assignments with their questions and variants
 * - Translation rows with cross-entity reuse lookups
 * - Publish job records polled by callers
 */

// Allow dead code and unused imports - database types are for library consumers
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::DatabaseConnection;
pub use repository::Repository;
