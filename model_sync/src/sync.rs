//! Migration orchestration
//!
//! Runs discovery, translation, introspection and diffing, then hands the
//! resulting plan to a [`MigrationExecutor`]. Model translation failures are
//! collected and reported; they never stop the run. Plan steps are applied
//! one by one and a failing step does not prevent the next ones.

use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::{Config, SchemaConfig};
use crate::db::executor::{MigrationExecutor, StepOutcome};
use crate::db::migrations::write_plan;
use crate::error::Result;
use crate::models::discovery::ModelDiscovery;
use crate::models::translator::DefinitionTranslator;
use crate::schema::analyzer::SchemaIntrospector;
use crate::schema::diff::SchemaDiff;
use crate::schema::generator::{MigrationGenerator, MigrationStep, SkippedChange};
use crate::schema::snapshot::{SchemaSnapshotBuilder, TranslationFailure};
use crate::utils::naming::NamingConvention;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Discovery returned no definitions
    NoModels,
    /// The database already matches the definitions
    NoDifferences,
    /// Every difference found is one the dialect cannot express
    OnlySkippedChanges,
    /// The plan was computed but applying was disabled
    DryRun,
    /// The confirmation gate refused the plan; nothing was applied
    Declined,
    /// Every step was attempted
    Applied,
}

/// A computed migration plan
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    pub model_count: usize,
    pub steps: Vec<MigrationStep>,
    /// Changes the dialect cannot express; reported, never applied
    pub skipped_changes: Vec<SkippedChange>,
    pub translation_failures: Vec<TranslationFailure>,
}

/// Outcome of a run
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub status: SyncStatus,
    pub model_count: usize,
    pub translation_failures: Vec<TranslationFailure>,
    pub steps: Vec<MigrationStep>,
    pub skipped_changes: Vec<SkippedChange>,
    /// One entry per attempted step, aligned with `steps`
    pub outcomes: Vec<StepOutcome>,
    pub plan_file: Option<PathBuf>,
}

impl SyncReport {
    fn new(status: SyncStatus, plan: MigrationPlan) -> Self {
        Self {
            status,
            model_count: plan.model_count,
            translation_failures: plan.translation_failures,
            steps: plan.steps,
            skipped_changes: plan.skipped_changes,
            outcomes: Vec::new(),
            plan_file: None,
        }
    }

    pub fn applied_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }

    /// Steps that failed, with their error message
    pub fn failed_steps(&self) -> Vec<(&MigrationStep, &str)> {
        self.steps
            .iter()
            .zip(&self.outcomes)
            .filter_map(|(step, outcome)| match outcome {
                StepOutcome::Failed(message) => Some((step, message.as_str())),
                StepOutcome::Applied => None,
            })
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.translation_failures.is_empty()
            || !self.skipped_changes.is_empty()
            || !self.failed_steps().is_empty()
    }
}

/// Orchestrates one reconciliation run
pub struct ModelSync<'a> {
    config: &'a Config,
    naming: &'a dyn NamingConvention,
    label: String,
}

impl<'a> ModelSync<'a> {
    pub fn new(config: &'a Config, naming: &'a dyn NamingConvention) -> Self {
        Self {
            config,
            naming,
            label: "model_sync".to_string(),
        }
    }

    /// Label used to name written plan files, usually the model group
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Comparison settings, with unsigned checks off where the dialect lacks them
    fn schema_config(&self) -> SchemaConfig {
        let mut schema_config = self.config.schema.clone();
        schema_config.compare_unsigned &= self.config.database.driver.supports_unsigned();
        schema_config
    }

    /// Discover, translate, capture and diff without touching the database
    pub async fn plan(
        &self,
        discovery: &dyn ModelDiscovery,
        introspector: &dyn SchemaIntrospector,
    ) -> Result<MigrationPlan> {
        let definitions = discovery.discover()?;
        info!(models = definitions.len(), "Discovered model definitions");

        if definitions.is_empty() {
            return Ok(MigrationPlan::default());
        }

        let translator = DefinitionTranslator::new(self.naming);
        let builder = SchemaSnapshotBuilder::new(translator, self.config.database.schema.clone());

        let (target, translation_failures) = builder.build_target(&definitions);
        let current = builder.capture_current(introspector).await?;

        let diff = SchemaDiff::generate(&current, &target, &self.schema_config());
        let (steps, skipped_changes) =
            MigrationGenerator::new(self.config).generate_migration_steps(&diff);

        Ok(MigrationPlan {
            model_count: definitions.len(),
            steps,
            skipped_changes,
            translation_failures,
        })
    }

    /// Compute the plan and apply it through the executor
    pub async fn run(
        &self,
        discovery: &dyn ModelDiscovery,
        introspector: &dyn SchemaIntrospector,
        executor: &dyn MigrationExecutor,
    ) -> Result<SyncReport> {
        let plan = self.plan(discovery, introspector).await?;

        for failure in &plan.translation_failures {
            warn!(model = %failure.model, error = %failure.message, "Model skipped");
        }

        if plan.model_count == 0 {
            info!("No model definitions were found, halting");
            return Ok(SyncReport::new(SyncStatus::NoModels, plan));
        }

        if plan.steps.is_empty() && !plan.skipped_changes.is_empty() {
            warn!(skipped = plan.skipped_changes.len(), "No applicable statements");
            return Ok(SyncReport::new(SyncStatus::OnlySkippedChanges, plan));
        }

        if plan.steps.is_empty() {
            info!("No differences detected");
            return Ok(SyncReport::new(SyncStatus::NoDifferences, plan));
        }

        let plan_file = match &self.config.migrations.output_directory {
            Some(directory) => Some(write_plan(directory, &self.label, &plan.steps)?),
            None => None,
        };

        if self.config.migrations.dry_run {
            info!(statements = plan.steps.len(), "Dry run, no statements applied");
            let mut report = SyncReport::new(SyncStatus::DryRun, plan);
            report.plan_file = plan_file;
            return Ok(report);
        }

        if !executor.confirm(&plan.steps).await? {
            info!("Plan declined, no statements applied");
            let mut report = SyncReport::new(SyncStatus::Declined, plan);
            report.plan_file = plan_file;
            return Ok(report);
        }

        info!(statements = plan.steps.len(), "Executing without deletes or drops");
        let mut outcomes = Vec::with_capacity(plan.steps.len());
        for (index, step) in plan.steps.iter().enumerate() {
            executor.on_step_started(index, step);
            let outcome = match executor.apply(step).await {
                Ok(()) => StepOutcome::Applied,
                Err(e) => StepOutcome::Failed(e.to_string()),
            };
            executor.on_step_completed(index, step, &outcome);
            outcomes.push(outcome);
        }

        let mut report = SyncReport::new(SyncStatus::Applied, plan);
        report.outcomes = outcomes;
        report.plan_file = plan_file;
        Ok(report)
    }
}
