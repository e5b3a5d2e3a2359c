//! Database module for model_sync
//!
//! This module handles database connections and plan execution.

pub mod connection;
pub mod executor;
pub mod migrations;

// Re-export key types
pub use connection::DatabaseConnection;
pub use executor::{Confirmation, MigrationExecutor, SqlExecutor, StepOutcome};
