//! Models module for model_sync
//!
//! This module handles model definitions, their discovery and their
//! translation into table schemas.

pub mod definition;
pub mod discovery;
pub mod translator;

// Re-export key types
pub use definition::{FieldMap, LogicalType, RawFieldDefinition, RawModelDefinition};
pub use discovery::{FileModelDiscovery, ModelDiscovery};
pub use translator::{DefinitionTranslator, ObjectModelDefinition};
