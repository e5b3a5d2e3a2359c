//! SQL executor
//!
//! The migration executor applies plan steps one at a time. It also owns the
//! confirmation gate that decides whether any step is applied at all.

use async_trait::async_trait;
use tracing::{error, info};

use crate::db::connection::DatabaseConnection;
use crate::error::Result;
use crate::schema::generator::MigrationStep;

/// Result of applying one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    Failed(String),
}

impl StepOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied)
    }
}

/// Applies migration steps to a database
#[async_trait]
pub trait MigrationExecutor: Send + Sync {
    /// Decide whether the whole plan may be applied
    async fn confirm(&self, steps: &[MigrationStep]) -> Result<bool>;

    /// Apply a single step
    async fn apply(&self, step: &MigrationStep) -> Result<()>;

    fn on_step_started(&self, _index: usize, _step: &MigrationStep) {}

    fn on_step_completed(&self, _index: usize, _step: &MigrationStep, _outcome: &StepOutcome) {}
}

/// Callback asked to approve a plan
pub type ConfirmFn = Box<dyn Fn(&[MigrationStep]) -> bool + Send + Sync>;

/// How the executor obtains approval for a plan
pub enum Confirmation {
    /// Apply without asking
    Always,
    /// Ask the callback
    Prompt(ConfirmFn),
}

/// SQL executor for running migration steps over a connection pool
pub struct SqlExecutor {
    connection: DatabaseConnection,
    confirmation: Confirmation,
}

impl SqlExecutor {
    /// Create a new SQL executor
    pub fn new(connection: DatabaseConnection, confirmation: Confirmation) -> Self {
        Self {
            connection,
            confirmation,
        }
    }
}

#[async_trait]
impl MigrationExecutor for SqlExecutor {
    async fn confirm(&self, steps: &[MigrationStep]) -> Result<bool> {
        Ok(match &self.confirmation {
            Confirmation::Always => true,
            Confirmation::Prompt(ask) => ask(steps),
        })
    }

    async fn apply(&self, step: &MigrationStep) -> Result<()> {
        self.connection.execute(&step.sql).await
    }

    fn on_step_started(&self, index: usize, step: &MigrationStep) {
        info!(step = index + 1, kind = %step.kind, table = %step.table, "Applying migration step");
    }

    fn on_step_completed(&self, index: usize, step: &MigrationStep, outcome: &StepOutcome) {
        match outcome {
            StepOutcome::Applied => {
                info!(step = index + 1, table = %step.table, "Migration step applied")
            }
            StepOutcome::Failed(message) => {
                error!(step = index + 1, table = %step.table, sql = %step.sql, error = %message, "Migration step failed")
            }
        }
    }
}
