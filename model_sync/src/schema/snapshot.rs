//! Schema snapshot builder
//!
//! Produces the desired snapshot from raw definitions and obtains the
//! current one from the live database.

use std::fmt;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::definition::RawModelDefinition;
use crate::models::translator::DefinitionTranslator;
use crate::schema::analyzer::SchemaIntrospector;
use crate::schema::types::SchemaSnapshot;

/// A model whose definition could not be translated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationFailure {
    pub model: String,
    pub message: String,
}

impl fmt::Display for TranslationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not read definition of {}: {}", self.model, self.message)
    }
}

/// Builds current and target snapshots
pub struct SchemaSnapshotBuilder<'a> {
    translator: DefinitionTranslator<'a>,
    schema_name: Option<String>,
}

impl<'a> SchemaSnapshotBuilder<'a> {
    pub fn new(translator: DefinitionTranslator<'a>, schema_name: Option<String>) -> Self {
        Self {
            translator,
            schema_name,
        }
    }

    /// Translate every definition into the target snapshot
    ///
    /// A definition that fails to translate is recorded and skipped. When two
    /// models map to the same qualified table the later one wins.
    pub fn build_target(
        &self,
        definitions: &[RawModelDefinition],
    ) -> (SchemaSnapshot, Vec<TranslationFailure>) {
        let mut target = SchemaSnapshot::new(self.schema_name.clone());
        let mut failures = Vec::new();

        for definition in definitions {
            let model = definition.identifier();

            let translated = match self.translator.translate(definition) {
                Ok(translated) => translated,
                Err(e) => {
                    warn!(model = %model, error = %e, "Could not translate model definition");
                    failures.push(TranslationFailure {
                        model,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            for table in translated.into_tables() {
                let table_name = table.name.clone();
                if target.add_table(table).is_some() {
                    warn!(
                        model = %model,
                        table = %target.qualified_name(&table_name),
                        "Table already defined by another model, replacing it"
                    );
                } else {
                    debug!(model = %model, table = %table_name, "Added table to target schema");
                }
            }
        }

        (target, failures)
    }

    /// Capture the live schema through the introspection collaborator
    pub async fn capture_current(
        &self,
        introspector: &dyn SchemaIntrospector,
    ) -> Result<SchemaSnapshot> {
        introspector.capture_current().await.map_err(|e| match e {
            Error::SnapshotUnavailableError(_) => e,
            other => Error::SnapshotUnavailableError(other.to_string()),
        })
    }
}
