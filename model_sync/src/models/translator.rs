//! Definition translator
//!
//! Turns one [`RawModelDefinition`] into a primary [`TableSchema`] and, for
//! localized models, a localization table keyed by language (and store).

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::definition::{RawFieldDefinition, RawModelDefinition};
use crate::schema::type_mapper::map_type;
use crate::schema::types::{ColumnSchema, StorageType, TableSchema};
use crate::utils::naming::NamingConvention;

/// Suffix appended to a model's table name to name its localization table
pub const LOCALIZATION_SUFFIX: &str = "_lang";
/// Locale key column of localization tables
pub const LOCALE_COLUMN: &str = "id_lang";
/// Store key column of per-store localization tables
pub const STORE_COLUMN: &str = "id_shop";

/// Translation result for one model
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectModelDefinition {
    primary_table: TableSchema,
    localization_table: Option<TableSchema>,
    is_localized: bool,
    is_localized_per_store: bool,
}

impl ObjectModelDefinition {
    pub fn primary_table(&self) -> &TableSchema {
        &self.primary_table
    }

    pub fn localization_table(&self) -> Option<&TableSchema> {
        self.localization_table.as_ref()
    }

    pub fn is_localized(&self) -> bool {
        self.is_localized
    }

    pub fn is_localized_per_store(&self) -> bool {
        self.is_localized_per_store
    }

    /// The primary table followed by the localization table, if any
    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        std::iter::once(&self.primary_table).chain(self.localization_table.iter())
    }

    pub fn into_tables(self) -> Vec<TableSchema> {
        std::iter::once(self.primary_table)
            .chain(self.localization_table)
            .collect()
    }
}

/// Translates raw model definitions into table schemas
pub struct DefinitionTranslator<'a> {
    naming: &'a dyn NamingConvention,
}

impl<'a> DefinitionTranslator<'a> {
    pub fn new(naming: &'a dyn NamingConvention) -> Self {
        Self { naming }
    }

    /// Translate one definition
    pub fn translate(&self, definition: &RawModelDefinition) -> Result<ObjectModelDefinition> {
        let table_name = required_part(definition.table_name.as_deref(), "table")?;
        let primary_key = required_part(definition.primary_key_name.as_deref(), "primary")?;
        let fields = match &definition.fields {
            Some(fields) if !fields.is_empty() => fields,
            _ => {
                return Err(Error::InvalidDefinitionError(format!(
                    "definition of '{}' declares no fields",
                    table_name
                )))
            }
        };

        let mut primary_table = TableSchema::new(&self.naming.table_name(table_name));
        primary_table.add_column(
            ColumnSchema::new(primary_key, StorageType::Integer)
                .nullable(false)
                .unsigned(true)
                .auto_increment(true),
        );
        primary_table.set_primary_key([primary_key]);

        let mut localization_table = if definition.is_localized {
            let name = self
                .naming
                .table_name(&format!("{}{}", table_name, LOCALIZATION_SUFFIX));
            let mut table = TableSchema::new(&name);

            let mut keys = vec![primary_key, LOCALE_COLUMN];
            if definition.is_localized_per_store {
                keys.push(STORE_COLUMN);
            }
            for key in &keys {
                table.add_column(
                    ColumnSchema::new(key, StorageType::Integer)
                        .nullable(false)
                        .unsigned(true),
                );
            }
            // A unique index over the keys, not a primary key
            table.add_unique_index(keys);
            Some(table)
        } else {
            None
        };

        for field in fields.iter() {
            let table = match localization_table.as_mut() {
                Some(table) if field.is_localized => table,
                _ => &mut primary_table,
            };

            if table.has_column(&field.name) {
                debug!(table = %table.name, column = %field.name, "Skipping repeated field");
                continue;
            }

            table.add_column(field_column(field)?);
        }

        Ok(ObjectModelDefinition {
            primary_table,
            localization_table,
            is_localized: definition.is_localized,
            is_localized_per_store: definition.is_localized_per_store,
        })
    }
}

fn required_part<'d>(value: Option<&'d str>, key: &str) -> Result<&'d str> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::InvalidDefinitionError(format!(
            "the definition does not declare '{}'",
            key
        ))),
    }
}

fn field_column(field: &RawFieldDefinition) -> Result<ColumnSchema> {
    let logical_type = field.logical_type.as_ref().ok_or_else(|| {
        Error::InvalidDefinitionError(format!("field '{}' declares no type", field.name))
    })?;
    let storage_type = map_type(logical_type)?;

    let mut column =
        ColumnSchema::new(&field.name, storage_type).nullable(!field.required.unwrap_or(false));

    if let Some(size) = field.size {
        column = column.length(size);
    }

    // A heuristic on the validator name, not a formal flag
    if column.storage_type.is_numeric() {
        let hinted = field
            .validation_hint
            .as_deref()
            .map_or(false, |hint| hint.to_lowercase().contains("unsigned"));
        if hinted {
            column = column.unsigned(true);
        }
    }

    Ok(column)
}
