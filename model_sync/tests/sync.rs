//! Tests for the migration orchestrator, using in-memory collaborators

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::Mutex;
use tempfile::tempdir;

use model_sync::config::Config;
use model_sync::models::{
    DefinitionTranslator, LogicalType, RawFieldDefinition, RawModelDefinition,
};
use model_sync::schema::{
    MigrationStep, SchemaIntrospector, SchemaSnapshot, SchemaSnapshotBuilder, StepKind,
};
use model_sync::utils::naming::DefaultNamingConvention;
use model_sync::{Dialect, Error, MigrationExecutor, ModelSync, Result, StepOutcome, SyncStatus};

fn config() -> Config {
    toml::from_str(
        r#"
        [database]
        driver = "mysql"
        url = "mysql://localhost/shop"
        "#,
    )
    .unwrap()
}

fn foo() -> RawModelDefinition {
    RawModelDefinition::new("foo", "id_foo")
        .field(RawFieldDefinition::new("name", LogicalType::String).required(true))
}

fn bar() -> RawModelDefinition {
    RawModelDefinition::new("bar", "id_bar")
        .field(RawFieldDefinition::new("active", LogicalType::Boolean))
}

fn unsupported() -> RawModelDefinition {
    RawModelDefinition::new("weird", "id_weird")
        .field(RawFieldDefinition::new("payload", LogicalType::from_code(42)))
}

/// Records applied statements and fails those containing `fail_on`
struct RecordingExecutor {
    approve: bool,
    fail_on: Option<&'static str>,
    confirmed: Mutex<usize>,
    applied: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    fn new(approve: bool) -> Self {
        Self {
            approve,
            fail_on: None,
            confirmed: Mutex::new(0),
            applied: Mutex::new(Vec::new()),
        }
    }

    fn failing_on(mut self, marker: &'static str) -> Self {
        self.fail_on = Some(marker);
        self
    }

    fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }

    fn confirmations(&self) -> usize {
        *self.confirmed.lock().unwrap()
    }
}

#[async_trait]
impl MigrationExecutor for RecordingExecutor {
    async fn confirm(&self, _steps: &[MigrationStep]) -> Result<bool> {
        *self.confirmed.lock().unwrap() += 1;
        Ok(self.approve)
    }

    async fn apply(&self, step: &MigrationStep) -> Result<()> {
        self.applied.lock().unwrap().push(step.table.clone());
        match self.fail_on {
            Some(marker) if step.sql.contains(marker) => {
                Err(Error::MigrationError(format!("refused {}", step.table)))
            }
            _ => Ok(()),
        }
    }
}

/// Introspection that always fails
struct UnreachableDatabase;

#[async_trait]
impl SchemaIntrospector for UnreachableDatabase {
    async fn capture_current(&self) -> Result<SchemaSnapshot> {
        Err(Error::DatabaseError("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_unsupported_model_does_not_stop_others() {
    let config = config();
    let naming = DefaultNamingConvention::default();
    let executor = RecordingExecutor::new(true);

    let report = ModelSync::new(&config, &naming)
        .run(&vec![unsupported(), foo()], &SchemaSnapshot::default(), &executor)
        .await
        .unwrap();

    assert_eq!(report.status, SyncStatus::Applied);
    assert_eq!(report.model_count, 2);
    assert_eq!(report.translation_failures.len(), 1);
    assert_eq!(report.translation_failures[0].model, "weird");
    assert!(report.translation_failures[0].message.contains("42"));

    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.steps[0].kind, StepKind::CreateTable);
    assert_eq!(executor.applied(), vec!["foo".to_string()]);
    assert_eq!(report.applied_count(), 1);
    assert!(report.has_failures());
}

#[tokio::test]
async fn test_failing_step_does_not_block_later_steps() {
    let config = config();
    let naming = DefaultNamingConvention::default();
    let executor = RecordingExecutor::new(true).failing_on("`foo`");

    let report = ModelSync::new(&config, &naming)
        .run(&vec![foo(), bar()], &SchemaSnapshot::default(), &executor)
        .await
        .unwrap();

    assert_eq!(executor.applied(), vec!["foo".to_string(), "bar".to_string()]);
    assert_eq!(
        report.outcomes,
        vec![
            StepOutcome::Failed("Migration error: refused foo".to_string()),
            StepOutcome::Applied,
        ]
    );

    let failed = report.failed_steps();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0.table, "foo");
    assert_eq!(report.applied_count(), 1);
}

#[tokio::test]
async fn test_sqlite_skipped_change_does_not_drop_the_plan() {
    let mut config = config();
    config.database.driver = Dialect::Sqlite;
    let naming = DefaultNamingConvention::default();
    let executor = RecordingExecutor::new(true);

    // The live foo still allows an empty name
    let builder = SchemaSnapshotBuilder::new(DefinitionTranslator::new(&naming), None);
    let (live, _) = builder.build_target(&[RawModelDefinition::new("foo", "id_foo")
        .field(RawFieldDefinition::new("name", LogicalType::String))]);

    let report = ModelSync::new(&config, &naming)
        .run(&vec![foo(), bar()], &live, &executor)
        .await
        .unwrap();

    assert_eq!(report.status, SyncStatus::Applied);
    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.steps[0].kind, StepKind::CreateTable);
    assert_eq!(executor.applied(), vec!["bar".to_string()]);

    assert_eq!(report.skipped_changes.len(), 1);
    assert_eq!(report.skipped_changes[0].kind, StepKind::AlterColumn);
    assert_eq!(report.skipped_changes[0].table, "foo");
    assert!(report.translation_failures.is_empty());
    assert!(report.has_failures());
}

#[tokio::test]
async fn test_only_skipped_changes_are_not_confirmed() {
    let mut config = config();
    config.database.driver = Dialect::Sqlite;
    let naming = DefaultNamingConvention::default();
    let executor = RecordingExecutor::new(true);

    let builder = SchemaSnapshotBuilder::new(DefinitionTranslator::new(&naming), None);
    let (live, _) = builder.build_target(&[RawModelDefinition::new("foo", "id_foo")
        .field(RawFieldDefinition::new("name", LogicalType::String))]);

    let report = ModelSync::new(&config, &naming)
        .run(&vec![foo()], &live, &executor)
        .await
        .unwrap();

    assert_eq!(report.status, SyncStatus::OnlySkippedChanges);
    assert!(report.steps.is_empty());
    assert_eq!(report.skipped_changes.len(), 1);
    assert_eq!(executor.confirmations(), 0);
    assert!(report.has_failures());
}

#[tokio::test]
async fn test_declined_plan_applies_nothing() {
    let config = config();
    let naming = DefaultNamingConvention::default();
    let executor = RecordingExecutor::new(false);

    let report = ModelSync::new(&config, &naming)
        .run(&vec![foo()], &SchemaSnapshot::default(), &executor)
        .await
        .unwrap();

    assert_eq!(report.status, SyncStatus::Declined);
    assert_eq!(report.steps.len(), 1);
    assert!(report.outcomes.is_empty());
    assert_eq!(executor.confirmations(), 1);
    assert!(executor.applied().is_empty());
}

#[tokio::test]
async fn test_no_models_halts_before_introspection() {
    let config = config();
    let naming = DefaultNamingConvention::default();
    let executor = RecordingExecutor::new(true);

    let report = ModelSync::new(&config, &naming)
        .run(&Vec::<RawModelDefinition>::new(), &UnreachableDatabase, &executor)
        .await
        .unwrap();

    assert_eq!(report.status, SyncStatus::NoModels);
    assert_eq!(executor.confirmations(), 0);
}

#[tokio::test]
async fn test_matching_database_reports_no_differences() {
    let config = config();
    let naming = DefaultNamingConvention::default();
    let executor = RecordingExecutor::new(true);
    let sync = ModelSync::new(&config, &naming);

    // Apply once against an empty database, then feed the result back as live state
    let definitions = vec![foo().localized(true), bar()];
    let plan = sync
        .plan(&definitions, &SchemaSnapshot::default())
        .await
        .unwrap();
    assert_eq!(plan.steps.len(), 3);

    let builder = SchemaSnapshotBuilder::new(DefinitionTranslator::new(&naming), None);
    let (live, _) = builder.build_target(&definitions);

    let report = sync.run(&definitions, &live, &executor).await.unwrap();
    assert_eq!(report.status, SyncStatus::NoDifferences);
    assert!(report.steps.is_empty());
    assert_eq!(executor.confirmations(), 0);
}

#[tokio::test]
async fn test_unavailable_snapshot_fails_the_run() {
    let config = config();
    let naming = DefaultNamingConvention::default();
    let executor = RecordingExecutor::new(true);

    let result = ModelSync::new(&config, &naming)
        .run(&vec![foo()], &UnreachableDatabase, &executor)
        .await;

    match result {
        Err(Error::SnapshotUnavailableError(message)) => {
            assert!(message.contains("connection refused"))
        }
        other => panic!("expected an unavailable snapshot, got {:?}", other.map(|r| r.status)),
    }
    assert!(executor.applied().is_empty());
}

#[tokio::test]
async fn test_dry_run_writes_plan_without_applying() {
    let dir = tempdir().unwrap();
    let mut config = config();
    config.migrations.dry_run = true;
    config.migrations.output_directory = Some(dir.path().join("plans"));

    let naming = DefaultNamingConvention::default();
    let executor = RecordingExecutor::new(true);

    let report = ModelSync::new(&config, &naming)
        .with_label("catalog")
        .run(&vec![foo()], &SchemaSnapshot::default(), &executor)
        .await
        .unwrap();

    assert_eq!(report.status, SyncStatus::DryRun);
    assert_eq!(executor.confirmations(), 0);
    assert!(executor.applied().is_empty());

    let plan_file = report.plan_file.expect("plan file");
    assert!(plan_file
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_catalog.sql"));

    let script = std::fs::read_to_string(plan_file).unwrap();
    assert!(script.starts_with("-- create table foo\nCREATE TABLE IF NOT EXISTS `foo` ("));
    assert!(script.contains("ENGINE = InnoDB;\n"));
}

#[tokio::test]
async fn test_unsigned_is_not_compared_on_postgres() {
    let mut config = config();
    config.database.driver = Dialect::Postgres;
    let naming = DefaultNamingConvention::default();
    let sync = ModelSync::new(&config, &naming);

    let definitions = vec![foo()];
    let builder = SchemaSnapshotBuilder::new(DefinitionTranslator::new(&naming), None);
    let (mut live, _) = builder.build_target(&definitions);
    for table in live.tables.values_mut() {
        for column in &mut table.columns {
            column.unsigned = None;
        }
    }

    let plan = sync.plan(&definitions, &live).await.unwrap();
    assert!(plan.steps.is_empty());
}
