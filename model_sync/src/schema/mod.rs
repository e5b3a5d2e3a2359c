//! Schema module for model_sync
//!
//! This module handles schema snapshots, their comparison and the SQL that
//! reconciles them.

pub mod analyzer;
pub mod diff;
pub mod generator;
pub mod snapshot;
pub mod type_mapper;
pub mod types;

// Re-export key types
pub use analyzer::{SchemaAnalyzer, SchemaIntrospector};
pub use diff::{ColumnChange, SchemaDiff, TableChanges};
pub use generator::{MigrationGenerator, MigrationStep, SkippedChange, StepKind};
pub use snapshot::{SchemaSnapshotBuilder, TranslationFailure};
pub use type_mapper::map_type;
pub use types::{ColumnSchema, SchemaSnapshot, StorageType, TableSchema};
