//! Schema difference calculator
//!
//! This module compares a current and a target snapshot. The result only
//! ever creates or alters: anything present in the current snapshot but
//! missing from the target is left untouched.

use indexmap::IndexSet;

use crate::config::SchemaConfig;
use crate::schema::types::{ColumnSchema, SchemaSnapshot, TableSchema};

/// Represents changes needed to bring the current schema to the target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDiff {
    /// Tables missing from the current schema, in target order
    pub tables_to_create: Vec<TableSchema>,
    /// Changes to tables present in both schemas, in target order
    pub tables_to_update: Vec<TableChanges>,
}

/// Additive changes to one existing table
#[derive(Debug, Clone, PartialEq)]
pub struct TableChanges {
    pub table_name: String,
    pub columns_to_add: Vec<ColumnSchema>,
    pub columns_to_alter: Vec<ColumnChange>,
    pub indexes_to_create: Vec<IndexSet<String>>,
}

impl TableChanges {
    fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            columns_to_add: Vec::new(),
            columns_to_alter: Vec::new(),
            indexes_to_create: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns_to_add.is_empty()
            && self.columns_to_alter.is_empty()
            && self.indexes_to_create.is_empty()
    }
}

/// Represents a column change
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChange {
    pub column_name: String,
    pub from: ColumnSchema,
    pub to: ColumnSchema,
}

impl SchemaDiff {
    /// Generate a schema diff between two snapshots
    pub fn generate(
        current_schema: &SchemaSnapshot,
        target_schema: &SchemaSnapshot,
        schema_config: &SchemaConfig,
    ) -> Self {
        let mut diff = SchemaDiff::default();

        for (qualified_name, target_table) in &target_schema.tables {
            let Some(current_table) = current_schema.tables.get(qualified_name) else {
                diff.tables_to_create.push(target_table.clone());
                continue;
            };

            let mut changes = TableChanges::new(&target_table.name);

            for target_col in &target_table.columns {
                match current_table.column(&target_col.name) {
                    None => changes.columns_to_add.push(target_col.clone()),
                    Some(current_col) => {
                        if Self::column_needs_alteration(current_col, target_col, schema_config) {
                            changes.columns_to_alter.push(ColumnChange {
                                column_name: target_col.name.clone(),
                                from: current_col.clone(),
                                to: target_col.clone(),
                            });
                        }
                    }
                }
            }

            for index in &target_table.unique_indexes {
                if !current_table.has_unique_index(index) {
                    changes.indexes_to_create.push(index.clone());
                }
            }

            if !changes.is_empty() {
                diff.tables_to_update.push(changes);
            }
        }

        diff
    }

    /// Check if a column needs to be altered
    fn column_needs_alteration(
        current: &ColumnSchema,
        target: &ColumnSchema,
        schema_config: &SchemaConfig,
    ) -> bool {
        if current.storage_type != target.storage_type {
            return true;
        }

        if current.nullable != target.nullable {
            return true;
        }

        if current.effective_length() != target.effective_length() {
            return true;
        }

        schema_config.compare_unsigned && current.is_unsigned() != target.is_unsigned()
    }

    /// Check if the diff is empty (no changes needed)
    pub fn is_empty(&self) -> bool {
        self.tables_to_create.is_empty() && self.tables_to_update.is_empty()
    }
}
