//! Migration generator
//!
//! This module renders a [`SchemaDiff`] into an ordered list of SQL
//! statements for the configured dialect. Table creations come first, then
//! per-table column additions, column alterations and index additions.

use indexmap::IndexSet;
use std::fmt;
use tracing::warn;

use crate::config::{Config, Dialect};
use crate::error::{Error, Result};
use crate::schema::diff::{ColumnChange, SchemaDiff};
use crate::schema::types::{ColumnSchema, StorageType, TableSchema};
use crate::utils::naming::{get_index_name, quote_identifier};

/// What a migration step does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    CreateTable,
    AddColumn,
    AlterColumn,
    AddIndex,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::CreateTable => write!(f, "create table"),
            StepKind::AddColumn => write!(f, "add column"),
            StepKind::AlterColumn => write!(f, "alter column"),
            StepKind::AddIndex => write!(f, "add index"),
        }
    }
}

/// One SQL statement of a migration plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStep {
    pub kind: StepKind,
    pub table: String,
    pub sql: String,
}

impl MigrationStep {
    fn new(kind: StepKind, table: &str, sql: String) -> Self {
        Self {
            kind,
            table: table.to_string(),
            sql,
        }
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};", self.sql)
    }
}

/// A change the dialect cannot express, left out of the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChange {
    pub kind: StepKind,
    pub table: String,
    pub reason: String,
}

impl fmt::Display for SkippedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Skipped {} on {}: {}", self.kind, self.table, self.reason)
    }
}

/// Migration SQL generator
pub struct MigrationGenerator<'a> {
    config: &'a Config,
}

impl<'a> MigrationGenerator<'a> {
    /// Create a new migration generator
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    fn dialect(&self) -> Dialect {
        self.config.database.driver
    }

    /// Generate the ordered migration plan for a schema diff
    ///
    /// Changes the dialect cannot express are returned separately and never
    /// prevent the remaining steps from being generated.
    pub fn generate_migration_steps(
        &self,
        diff: &SchemaDiff,
    ) -> (Vec<MigrationStep>, Vec<SkippedChange>) {
        let mut steps = Vec::new();
        let mut skipped = Vec::new();

        for table in &diff.tables_to_create {
            steps.push(MigrationStep::new(
                StepKind::CreateTable,
                &table.name,
                self.generate_create_table_sql(table),
            ));

            // MySQL declares unique keys inside CREATE TABLE
            if self.dialect() != Dialect::Mysql {
                for index in &table.unique_indexes {
                    steps.push(MigrationStep::new(
                        StepKind::AddIndex,
                        &table.name,
                        self.generate_create_index_sql(&table.name, index),
                    ));
                }
            }
        }

        for changes in &diff.tables_to_update {
            let table_name = &changes.table_name;

            for column in &changes.columns_to_add {
                match self.generate_add_column_sql(table_name, column) {
                    Ok(sql) => steps.push(MigrationStep::new(StepKind::AddColumn, table_name, sql)),
                    Err(e) => skipped.push(skip(StepKind::AddColumn, table_name, e)),
                }
            }

            for change in &changes.columns_to_alter {
                match self.generate_alter_column_sql(table_name, change) {
                    Ok(Some(sql)) => {
                        steps.push(MigrationStep::new(StepKind::AlterColumn, table_name, sql))
                    }
                    Ok(None) => {}
                    Err(e) => skipped.push(skip(StepKind::AlterColumn, table_name, e)),
                }
            }

            for index in &changes.indexes_to_create {
                steps.push(MigrationStep::new(
                    StepKind::AddIndex,
                    table_name,
                    self.generate_create_index_sql(table_name, index),
                ));
            }
        }

        for change in &skipped {
            warn!(table = %change.table, kind = %change.kind, reason = %change.reason, "Change left out of the plan");
        }

        (steps, skipped)
    }

    fn quote(&self, name: &str) -> String {
        quote_identifier(name, self.dialect())
    }

    fn quote_all<'c>(&self, columns: impl IntoIterator<Item = &'c String>) -> String {
        columns
            .into_iter()
            .map(|col| self.quote(col))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn index_name(&self, table_name: &str, columns: &IndexSet<String>) -> String {
        let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
        get_index_name(
            &self.config.naming.index_pattern,
            table_name,
            &columns,
            self.dialect(),
        )
    }

    /// Generate SQL to create a table
    fn generate_create_table_sql(&self, table: &TableSchema) -> String {
        let dialect = self.dialect();

        // SQLite only auto-increments an inline INTEGER PRIMARY KEY
        let inline_pk = dialect == Dialect::Sqlite
            && table.primary_key.len() == 1
            && table.columns.iter().any(|col| {
                col.auto_increment && table.primary_key.contains(&col.name)
            });

        let mut definitions: Vec<String> = table
            .columns
            .iter()
            .map(|col| format!("  {}", self.column_definition(col, inline_pk)))
            .collect();

        if !table.primary_key.is_empty() && !inline_pk {
            definitions.push(format!(
                "  PRIMARY KEY ({})",
                self.quote_all(&table.primary_key)
            ));
        }

        if dialect == Dialect::Mysql {
            for index in &table.unique_indexes {
                definitions.push(format!(
                    "  UNIQUE INDEX {} ({})",
                    self.quote(&self.index_name(&table.name, index)),
                    self.quote_all(index)
                ));
            }
        }

        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.quote(&table.name),
            definitions.join(",\n")
        );

        if dialect == Dialect::Mysql {
            sql.push_str(" DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci ENGINE = InnoDB");
        }

        sql
    }

    /// Generate SQL to add a column to an existing table
    fn generate_add_column_sql(&self, table_name: &str, column: &ColumnSchema) -> Result<String> {
        let table = self.quote(table_name);

        match self.dialect() {
            Dialect::Mysql => Ok(format!(
                "ALTER TABLE {} ADD {}",
                table,
                self.column_definition(column, false)
            )),
            Dialect::Postgres => Ok(format!(
                "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {}",
                table,
                self.column_definition(column, false)
            )),
            Dialect::Sqlite => {
                if !column.nullable {
                    return Err(Error::MigrationError(format!(
                        "SQLite cannot add NOT NULL column '{}' to '{}' without a default value",
                        column.name, table_name
                    )));
                }
                Ok(format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    table,
                    self.column_definition(column, false)
                ))
            }
        }
    }

    /// Generate SQL to alter a column; `None` when nothing the dialect can express changed
    fn generate_alter_column_sql(
        &self,
        table_name: &str,
        change: &ColumnChange,
    ) -> Result<Option<String>> {
        let table = self.quote(table_name);

        match self.dialect() {
            Dialect::Mysql => Ok(Some(format!(
                "ALTER TABLE {} MODIFY {}",
                table,
                self.column_definition(&change.to, false)
            ))),
            Dialect::Postgres => {
                let column = self.quote(&change.column_name);
                let mut clauses = Vec::new();

                if change.from.storage_type != change.to.storage_type
                    || change.from.effective_length() != change.to.effective_length()
                {
                    clauses.push(format!(
                        "ALTER COLUMN {} TYPE {}",
                        column,
                        self.column_type(&change.to)
                    ));
                }

                if change.from.nullable != change.to.nullable {
                    let action = if change.to.nullable {
                        "DROP NOT NULL"
                    } else {
                        "SET NOT NULL"
                    };
                    clauses.push(format!("ALTER COLUMN {} {}", column, action));
                }

                if clauses.is_empty() {
                    return Ok(None);
                }
                Ok(Some(format!("ALTER TABLE {} {}", table, clauses.join(", "))))
            }
            Dialect::Sqlite => Err(Error::MigrationError(format!(
                "SQLite cannot alter column '{}' of '{}'; the table has to be rebuilt",
                change.column_name, table_name
            ))),
        }
    }

    /// Generate SQL to create a unique index
    fn generate_create_index_sql(&self, table_name: &str, columns: &IndexSet<String>) -> String {
        let guard = match self.dialect() {
            Dialect::Mysql => "",
            Dialect::Postgres | Dialect::Sqlite => "IF NOT EXISTS ",
        };

        format!(
            "CREATE UNIQUE INDEX {}{} ON {} ({})",
            guard,
            self.quote(&self.index_name(table_name, columns)),
            self.quote(table_name),
            self.quote_all(columns)
        )
    }

    /// Render a column definition for CREATE TABLE and ADD/MODIFY clauses
    fn column_definition(&self, column: &ColumnSchema, inline_pk: bool) -> String {
        let name = self.quote(&column.name);
        let null = if column.nullable { "NULL" } else { "NOT NULL" };

        match self.dialect() {
            Dialect::Mysql => {
                let mut sql = format!("{} {} {}", name, self.column_type(column), null);
                if column.auto_increment {
                    sql.push_str(" AUTO_INCREMENT");
                }
                sql
            }
            Dialect::Postgres => {
                if column.auto_increment {
                    format!(
                        "{} {} GENERATED BY DEFAULT AS IDENTITY NOT NULL",
                        name,
                        self.column_type(column)
                    )
                } else {
                    format!("{} {} {}", name, self.column_type(column), null)
                }
            }
            Dialect::Sqlite => {
                if inline_pk && column.auto_increment {
                    format!("{} INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL", name)
                } else {
                    format!("{} {} {}", name, self.column_type(column), null)
                }
            }
        }
    }

    /// Render the column type for the dialect
    fn column_type(&self, column: &ColumnSchema) -> String {
        let dialect = self.dialect();
        let unsigned = if dialect.supports_unsigned() && column.is_unsigned() {
            " UNSIGNED"
        } else {
            ""
        };

        match (&column.storage_type, dialect) {
            (StorageType::Integer, Dialect::Mysql) => format!("INT{}", unsigned),
            (StorageType::Integer, _) => "INTEGER".to_string(),
            (StorageType::Boolean, Dialect::Mysql) => "TINYINT(1)".to_string(),
            (StorageType::Boolean, _) => "BOOLEAN".to_string(),
            (StorageType::String, _) => {
                format!("VARCHAR({})", column.effective_length().unwrap_or_default())
            }
            (StorageType::Float, _) => format!("DOUBLE PRECISION{}", unsigned),
            (StorageType::DateTime, Dialect::Postgres) => {
                "TIMESTAMP(0) WITHOUT TIME ZONE".to_string()
            }
            (StorageType::DateTime, _) => "DATETIME".to_string(),
            (StorageType::Text, Dialect::Mysql) => "LONGTEXT".to_string(),
            (StorageType::Text, Dialect::Postgres) => "TEXT".to_string(),
            (StorageType::Text, Dialect::Sqlite) => "CLOB".to_string(),
            (StorageType::Other(raw), _) => raw.clone(),
        }
    }
}

fn skip(kind: StepKind, table: &str, error: Error) -> SkippedChange {
    let reason = match error {
        Error::MigrationError(message) => message,
        other => other.to_string(),
    };
    SkippedChange {
        kind,
        table: table.to_string(),
        reason,
    }
}

/// Render a plan as a SQL script, one statement per line group
pub fn render_script(steps: &[MigrationStep]) -> String {
    let mut script = String::new();
    for step in steps {
        script.push_str(&format!("-- {} {}\n{}\n\n", step.kind, step.table, step));
    }
    script
}
