//! Error types for model_sync

use thiserror::Error;

/// Result type for model_sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for model_sync
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A definition is missing its table, primary key or fields.
    /// Aborts the translation of that one model only.
    #[error("Invalid definition: {0}")]
    InvalidDefinitionError(String),

    /// A field declares a logical type with no storage counterpart.
    /// Aborts the translation of that one model only.
    #[error("Field type '{0}' is not supported")]
    UnsupportedTypeError(String),

    /// The live schema could not be captured. Fatal to the run.
    #[error("Current schema unavailable: {0}")]
    SnapshotUnavailableError(String),

    #[error("Model discovery error: {0}")]
    DiscoveryError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Convert Serde JSON errors to model_sync errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert YAML errors to model_sync errors
impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to model_sync errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
