//! Logical field type to storage type mapping

use crate::error::{Error, Result};
use crate::models::definition::LogicalType;
use crate::schema::types::StorageType;

/// Map a declared field type to the storage type used for its column
pub fn map_type(logical_type: &LogicalType) -> Result<StorageType> {
    match logical_type {
        LogicalType::Integer => Ok(StorageType::Integer),
        LogicalType::Boolean => Ok(StorageType::Boolean),
        LogicalType::String => Ok(StorageType::String),
        LogicalType::Float => Ok(StorageType::Float),
        LogicalType::Date => Ok(StorageType::DateTime),
        LogicalType::Html | LogicalType::Sql => Ok(StorageType::Text),
        LogicalType::Nothing | LogicalType::Unknown(_) => {
            Err(Error::UnsupportedTypeError(logical_type.to_string()))
        }
    }
}
