//! Type definitions for normalized schema objects

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length assumed for string columns that do not declare one
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Normalized column type used for schema comparison
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    Integer,
    Boolean,
    String,
    Float,
    DateTime,
    Text,
    /// A live column type outside the normalized set, kept verbatim
    Other(String),
}

impl StorageType {
    /// Integer and float columns may be unsigned
    pub fn is_numeric(&self) -> bool {
        matches!(self, StorageType::Integer | StorageType::Float)
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Integer => write!(f, "integer"),
            StorageType::Boolean => write!(f, "boolean"),
            StorageType::String => write!(f, "string"),
            StorageType::Float => write!(f, "float"),
            StorageType::DateTime => write!(f, "datetime"),
            StorageType::Text => write!(f, "text"),
            StorageType::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// Represents a whole-schema snapshot, either live or desired
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub schema_name: Option<String>,
    /// Tables keyed by qualified name, in insertion order
    pub tables: IndexMap<String, TableSchema>,
}

impl SchemaSnapshot {
    /// Create a new empty snapshot
    pub fn new(schema_name: Option<String>) -> Self {
        Self {
            schema_name,
            tables: IndexMap::new(),
        }
    }

    /// Qualify a bare table name with this snapshot's schema
    pub fn qualified_name(&self, table_name: &str) -> String {
        match &self.schema_name {
            Some(schema) if !schema.is_empty() => format!("{}.{}", schema, table_name),
            _ => table_name.to_string(),
        }
    }

    /// Add a table, returning the table previously stored under the same qualified name
    pub fn add_table(&mut self, table: TableSchema) -> Option<TableSchema> {
        let key = self.qualified_name(&table.name);
        self.tables.insert(key, table)
    }

    /// Look up a table by its bare name
    pub fn table(&self, table_name: &str) -> Option<&TableSchema> {
        self.tables.get(&self.qualified_name(table_name))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Represents a database table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub primary_key: IndexSet<String>,
    pub unique_indexes: Vec<IndexSet<String>>,
}

impl TableSchema {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: IndexSet::new(),
            unique_indexes: Vec::new(),
        }
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: ColumnSchema) {
        self.columns.push(column);
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|col| col.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|col| col.name == name)
    }

    /// Set the primary key columns for the table
    pub fn set_primary_key<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
    }

    /// Add a unique index over the given columns
    pub fn add_unique_index<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_indexes
            .push(columns.into_iter().map(Into::into).collect());
    }

    /// Whether a unique index covering exactly these columns exists, in any order
    pub fn has_unique_index(&self, columns: &IndexSet<String>) -> bool {
        self.unique_indexes
            .iter()
            .any(|index| index.len() == columns.len() && index.is_subset(columns))
    }
}

/// Represents a database column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub storage_type: StorageType,
    pub nullable: bool,
    pub length: Option<u32>,
    pub unsigned: Option<bool>,
    pub auto_increment: bool,
}

impl ColumnSchema {
    /// Create a new nullable column with the given name and type
    pub fn new(name: &str, storage_type: StorageType) -> Self {
        Self {
            name: name.to_string(),
            storage_type,
            nullable: true,
            length: None,
            unsigned: None,
            auto_increment: false,
        }
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = Some(unsigned);
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    /// Length that applies when comparing or rendering; only strings carry one
    pub fn effective_length(&self) -> Option<u32> {
        match self.storage_type {
            StorageType::String => Some(self.length.unwrap_or(DEFAULT_STRING_LENGTH)),
            _ => None,
        }
    }

    pub fn is_unsigned(&self) -> bool {
        self.storage_type.is_numeric() && self.unsigned.unwrap_or(false)
    }
}
