//! Raw model definitions as produced by model discovery
//!
//! These records mirror the loosely-typed definition format models are
//! declared in. Nothing here is validated: a missing table or primary key
//! is a translation error for that one model, not a parse failure.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Domain-level field type declared by a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LogicalType {
    Integer,
    Boolean,
    String,
    Float,
    Date,
    Html,
    Sql,
    Nothing,
    /// Any value that is not a known type code or name
    Unknown(String),
}

impl LogicalType {
    /// Map a numeric type code (1 = int ... 8 = sql)
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => LogicalType::Integer,
            2 => LogicalType::Boolean,
            3 => LogicalType::String,
            4 => LogicalType::Float,
            5 => LogicalType::Date,
            6 => LogicalType::Html,
            7 => LogicalType::Nothing,
            8 => LogicalType::Sql,
            other => LogicalType::Unknown(other.to_string()),
        }
    }

    /// Map a type name, case-insensitively
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "int" | "integer" => LogicalType::Integer,
            "bool" | "boolean" => LogicalType::Boolean,
            "string" => LogicalType::String,
            "float" => LogicalType::Float,
            "date" | "datetime" => LogicalType::Date,
            "html" => LogicalType::Html,
            "sql" => LogicalType::Sql,
            "nothing" => LogicalType::Nothing,
            _ => LogicalType::Unknown(name.to_string()),
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Integer => write!(f, "int"),
            LogicalType::Boolean => write!(f, "bool"),
            LogicalType::String => write!(f, "string"),
            LogicalType::Float => write!(f, "float"),
            LogicalType::Date => write!(f, "date"),
            LogicalType::Html => write!(f, "html"),
            LogicalType::Sql => write!(f, "sql"),
            LogicalType::Nothing => write!(f, "nothing"),
            LogicalType::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

impl<'de> Deserialize<'de> for LogicalType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(i64),
            Name(String),
            // Floats, booleans, lists; translation rejects them as unsupported
            Other(serde_json::Value),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Code(code) => LogicalType::from_code(code),
            Repr::Name(name) => LogicalType::from_name(&name),
            Repr::Other(value) => LogicalType::Unknown(value.to_string()),
        })
    }
}

/// One declared field of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFieldDefinition {
    /// Filled from the key of the field map
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub logical_type: Option<LogicalType>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(rename = "validate", default)]
    pub validation_hint: Option<String>,
    #[serde(rename = "lang", default)]
    pub is_localized: bool,
}

impl RawFieldDefinition {
    pub fn new(name: &str, logical_type: LogicalType) -> Self {
        Self {
            name: name.to_string(),
            logical_type: Some(logical_type),
            required: None,
            size: None,
            validation_hint: None,
            is_localized: false,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn validate(mut self, hint: &str) -> Self {
        self.validation_hint = Some(hint.to_string());
        self
    }

    pub fn localized(mut self, localized: bool) -> Self {
        self.is_localized = localized;
        self
    }
}

/// Ordered field map that keeps repeated keys
///
/// Definition maps may repeat a field name. Every entry is kept in input
/// order; the translator decides which one contributes a column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldMap(pub Vec<RawFieldDefinition>);

impl FieldMap {
    pub fn iter(&self) -> std::slice::Iter<'_, RawFieldDefinition> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, field: RawFieldDefinition) {
        self.0.push(field);
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldMapVisitor;

        impl<'de> Visitor<'de> for FieldMapVisitor {
            type Value = FieldMap;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of field names to field definitions")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<FieldMap, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, mut field)) =
                    access.next_entry::<String, RawFieldDefinition>()?
                {
                    if name.is_empty() {
                        return Err(de::Error::custom("field names must not be empty"));
                    }
                    field.name = name;
                    fields.push(field);
                }
                Ok(FieldMap(fields))
            }
        }

        deserializer.deserialize_map(FieldMapVisitor)
    }
}

/// One model definition as discovered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawModelDefinition {
    #[serde(rename = "table", default)]
    pub table_name: Option<String>,
    #[serde(rename = "primary", default)]
    pub primary_key_name: Option<String>,
    #[serde(default)]
    pub fields: Option<FieldMap>,
    #[serde(rename = "multilang", default)]
    pub is_localized: bool,
    #[serde(rename = "multilang_shop", default)]
    pub is_localized_per_store: bool,
    /// Where the definition was read from, for failure reports
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl RawModelDefinition {
    pub fn new(table_name: &str, primary_key_name: &str) -> Self {
        Self {
            table_name: Some(table_name.to_string()),
            primary_key_name: Some(primary_key_name.to_string()),
            fields: Some(FieldMap::default()),
            ..Default::default()
        }
    }

    pub fn field(mut self, field: RawFieldDefinition) -> Self {
        self.fields.get_or_insert_with(FieldMap::default).push(field);
        self
    }

    pub fn localized(mut self, localized: bool) -> Self {
        self.is_localized = localized;
        self
    }

    pub fn localized_per_store(mut self, per_store: bool) -> Self {
        self.is_localized_per_store = per_store;
        self
    }

    /// Human-readable identifier: the source path, else the table name
    pub fn identifier(&self) -> String {
        if let Some(source) = &self.source {
            return source.display().to_string();
        }
        match &self.table_name {
            Some(table) if !table.is_empty() => table.clone(),
            _ => "<unnamed model>".to_string(),
        }
    }
}
