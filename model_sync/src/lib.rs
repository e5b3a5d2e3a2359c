//! model_sync: keeps a database in line with declarative model definitions
//!
//! Model definitions are translated into table schemas (plus a localization
//! table for localized models), compared with the live schema, and the
//! differences are applied as a non-destructive list of SQL statements.
//! Tables and columns are created or altered, never dropped.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod schema;
pub mod sync;
pub mod utils;

// Re-export main types for easier access
pub use config::{Config, Dialect};
pub use db::connection::DatabaseConnection;
pub use db::executor::{Confirmation, MigrationExecutor, SqlExecutor, StepOutcome};
pub use error::{Error, Result};
pub use models::{DefinitionTranslator, FileModelDiscovery, ModelDiscovery, RawModelDefinition};
pub use schema::{MigrationGenerator, SchemaAnalyzer, SchemaDiff, SchemaIntrospector};
pub use sync::{ModelSync, SyncReport, SyncStatus};
pub use utils::naming::{DefaultNamingConvention, NamingConvention};

/// Initialize model_sync with the specified configuration file
pub async fn init(config_path: &str) -> Result<ModelSyncClient> {
    let config = config::load_from_file(config_path)?;
    ModelSyncClient::new(config).await
}

/// The main client for reconciling a database with model definitions
pub struct ModelSyncClient {
    config: Config,
    db_connection: DatabaseConnection,
    naming: DefaultNamingConvention,
}

impl ModelSyncClient {
    /// Create a new client from configuration
    pub async fn new(config: Config) -> Result<Self> {
        let db_connection = DatabaseConnection::connect(&config.database).await?;
        let naming = DefaultNamingConvention::from_config(&config.naming);

        Ok(Self {
            config,
            db_connection,
            naming,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze the current database schema
    pub async fn analyze_database_schema(&self) -> Result<schema::SchemaSnapshot> {
        self.analyzer().analyze().await
    }

    fn analyzer(&self) -> SchemaAnalyzer {
        SchemaAnalyzer::new(
            self.db_connection.clone(),
            self.config.database.schema.clone(),
        )
    }

    /// Reconcile the database with the models of one group
    pub async fn upgrade_database(
        &self,
        group: &str,
        confirmation: Confirmation,
    ) -> Result<SyncReport> {
        let discovery = FileModelDiscovery::new(&self.config.models, group)?;
        tracing::info!(
            group,
            directory = %discovery.directory().display(),
            "Checking model group"
        );
        let executor = SqlExecutor::new(self.db_connection.clone(), confirmation);

        ModelSync::new(&self.config, &self.naming)
            .with_label(group)
            .run(&discovery, &self.analyzer(), &executor)
            .await
    }
}
