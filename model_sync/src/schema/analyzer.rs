//! Database schema analyzer
//!
//! This module captures the current schema of a live database as a
//! [`SchemaSnapshot`].

use async_trait::async_trait;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{FromRow, MySql, Pool, Postgres, Row, Sqlite};
use tracing::debug;

use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};
use crate::schema::types::{ColumnSchema, SchemaSnapshot, StorageType, TableSchema};

/// Name under which primary keys are reported by the index queries
const PRIMARY_INDEX: &str = "PRIMARY";

/// Provides the current schema of the database
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    async fn capture_current(&self) -> Result<SchemaSnapshot>;
}

/// A fixed snapshot, useful when the live state is already known
#[async_trait]
impl SchemaIntrospector for SchemaSnapshot {
    async fn capture_current(&self) -> Result<SchemaSnapshot> {
        Ok(self.clone())
    }
}

/// Schema analyzer for database schema introspection
pub struct SchemaAnalyzer {
    connection: DatabaseConnection,
    schema_name: Option<String>,
}

impl SchemaAnalyzer {
    /// Create a new schema analyzer
    pub fn new(connection: DatabaseConnection, schema_name: Option<String>) -> Self {
        Self {
            connection,
            schema_name,
        }
    }

    /// Analyze the current database schema
    pub async fn analyze(&self) -> Result<SchemaSnapshot> {
        let (columns, indexes) = match &self.connection {
            DatabaseConnection::Postgres(pool) => {
                let schema = self.schema_name.as_deref().unwrap_or("public");
                analyze_postgres(pool, schema).await?
            }
            DatabaseConnection::MySql(pool) => analyze_mysql(pool).await?,
            DatabaseConnection::Sqlite(pool) => analyze_sqlite(pool).await?,
        };

        let snapshot = assemble_snapshot(self.schema_name.clone(), columns, indexes);
        debug!(tables = snapshot.tables.len(), "Captured current schema");
        Ok(snapshot)
    }
}

#[async_trait]
impl SchemaIntrospector for SchemaAnalyzer {
    async fn capture_current(&self) -> Result<SchemaSnapshot> {
        self.analyze()
            .await
            .map_err(|e| Error::SnapshotUnavailableError(e.to_string()))
    }
}

#[derive(FromRow)]
struct ColumnRow {
    table_name: String,
    column_name: String,
    data_type: String,
    is_nullable: String,
    character_maximum_length: Option<i64>,
    extra: Option<String>,
}

#[derive(FromRow)]
struct IndexRow {
    table_name: String,
    index_name: String,
    column_name: String,
}

/// A live column together with the table it belongs to
struct LiveColumn {
    table_name: String,
    column: ColumnSchema,
}

impl From<ColumnRow> for LiveColumn {
    fn from(row: ColumnRow) -> Self {
        let (storage_type, length, unsigned) =
            parse_column_type(&row.data_type, row.character_maximum_length);

        let mut column = ColumnSchema::new(&row.column_name, storage_type)
            .nullable(row.is_nullable.eq_ignore_ascii_case("YES"))
            .auto_increment(
                row.extra
                    .as_deref()
                    .map_or(false, |extra| extra.to_lowercase().contains("auto_increment")),
            );
        column.length = length;
        if unsigned {
            column.unsigned = Some(true);
        }

        LiveColumn {
            table_name: row.table_name,
            column,
        }
    }
}

async fn analyze_postgres(
    pool: &Pool<Postgres>,
    schema: &str,
) -> Result<(Vec<LiveColumn>, Vec<IndexRow>)> {
    let sql = r#"
        SELECT
            c.table_name::text AS table_name,
            c.column_name::text AS column_name,
            c.data_type::text AS data_type,
            c.is_nullable::text AS is_nullable,
            c.character_maximum_length::bigint AS character_maximum_length,
            CASE
                WHEN c.is_identity = 'YES' OR c.column_default LIKE 'nextval(%' THEN 'auto_increment'
            END AS extra
        FROM information_schema.columns c
        JOIN information_schema.tables t
            ON t.table_schema = c.table_schema AND t.table_name = c.table_name
        WHERE c.table_schema = $1 AND t.table_type = 'BASE TABLE'
        ORDER BY c.table_name, c.ordinal_position
    "#;

    let columns = sqlx::query_as::<_, ColumnRow>(sql)
        .bind(schema)
        .fetch_all(pool)
        .await?;

    let sql = r#"
        SELECT
            t.relname::text AS table_name,
            CASE WHEN ix.indisprimary THEN 'PRIMARY' ELSE i.relname::text END AS index_name,
            a.attname::text AS column_name
        FROM pg_index ix
        JOIN pg_class i ON i.oid = ix.indexrelid
        JOIN pg_class t ON t.oid = ix.indrelid
        JOIN pg_namespace n ON n.oid = t.relnamespace
        JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord) ON true
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
        WHERE n.nspname = $1 AND ix.indisunique
        ORDER BY t.relname, i.relname, k.ord
    "#;

    let indexes = sqlx::query_as::<_, IndexRow>(sql)
        .bind(schema)
        .fetch_all(pool)
        .await?;

    Ok((columns.into_iter().map(LiveColumn::from).collect(), indexes))
}

async fn analyze_mysql(pool: &Pool<MySql>) -> Result<(Vec<LiveColumn>, Vec<IndexRow>)> {
    let sql = r#"
        SELECT
            CAST(c.TABLE_NAME AS CHAR) AS table_name,
            CAST(c.COLUMN_NAME AS CHAR) AS column_name,
            CAST(c.COLUMN_TYPE AS CHAR) AS data_type,
            CAST(c.IS_NULLABLE AS CHAR) AS is_nullable,
            CAST(c.CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS character_maximum_length,
            CAST(c.EXTRA AS CHAR) AS extra
        FROM information_schema.COLUMNS c
        JOIN information_schema.TABLES t
            ON t.TABLE_SCHEMA = c.TABLE_SCHEMA AND t.TABLE_NAME = c.TABLE_NAME
        WHERE c.TABLE_SCHEMA = DATABASE() AND t.TABLE_TYPE = 'BASE TABLE'
        ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION
    "#;

    let columns = sqlx::query_as::<_, ColumnRow>(sql).fetch_all(pool).await?;

    let sql = r#"
        SELECT
            CAST(TABLE_NAME AS CHAR) AS table_name,
            CAST(INDEX_NAME AS CHAR) AS index_name,
            CAST(COLUMN_NAME AS CHAR) AS column_name
        FROM information_schema.STATISTICS
        WHERE TABLE_SCHEMA = DATABASE() AND NON_UNIQUE = 0
        ORDER BY TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX
    "#;

    let indexes = sqlx::query_as::<_, IndexRow>(sql).fetch_all(pool).await?;

    Ok((columns.into_iter().map(LiveColumn::from).collect(), indexes))
}

async fn analyze_sqlite(pool: &Pool<Sqlite>) -> Result<(Vec<LiveColumn>, Vec<IndexRow>)> {
    let sql = r#"
        SELECT m.name AS table_name, p.name AS column_name, p.type AS data_type,
               p."notnull" AS not_null, p.pk AS pk
        FROM sqlite_master m
        JOIN pragma_table_info(m.name) p
        WHERE m.type = 'table' AND m.name NOT LIKE 'sqlite_%'
        ORDER BY m.name, p.cid
    "#;

    let rows = sqlx::query(sql).fetch_all(pool).await?;

    let mut columns = Vec::with_capacity(rows.len());
    let mut primary_keys: Vec<(String, i64, String)> = Vec::new();
    for row in rows {
        let table_name: String = row.try_get("table_name")?;
        let column_name: String = row.try_get("column_name")?;
        let data_type: String = row.try_get("data_type")?;
        let not_null: i64 = row.try_get("not_null")?;
        let pk: i64 = row.try_get("pk")?;

        if pk > 0 {
            primary_keys.push((table_name.clone(), pk, column_name.clone()));
        }

        let (storage_type, length, _) = parse_column_type(&data_type, None);
        // INTEGER PRIMARY KEY aliases the rowid and increments on its own
        let auto_increment = pk == 1 && data_type.eq_ignore_ascii_case("integer");
        let mut column = ColumnSchema::new(&column_name, storage_type)
            .nullable(not_null == 0 && pk == 0)
            .auto_increment(auto_increment);
        column.length = length;

        columns.push(LiveColumn { table_name, column });
    }

    primary_keys.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    let mut indexes: Vec<IndexRow> = primary_keys
        .into_iter()
        .map(|(table_name, _, column_name)| IndexRow {
            table_name,
            index_name: PRIMARY_INDEX.to_string(),
            column_name,
        })
        .collect();

    let sql = r#"
        SELECT m.name AS table_name, il.name AS index_name, ii.name AS column_name
        FROM sqlite_master m
        JOIN pragma_index_list(m.name) il
        JOIN pragma_index_info(il.name) ii
        WHERE m.type = 'table' AND il."unique" = 1 AND il.origin <> 'pk'
        ORDER BY m.name, il.name, ii.seqno
    "#;

    indexes.extend(sqlx::query_as::<_, IndexRow>(sql).fetch_all(pool).await?);

    Ok((columns, indexes))
}

/// Group columns and index rows into tables
fn assemble_snapshot(
    schema_name: Option<String>,
    columns: Vec<LiveColumn>,
    indexes: Vec<IndexRow>,
) -> SchemaSnapshot {
    let mut tables: IndexMap<String, TableSchema> = IndexMap::new();

    for live in columns {
        tables
            .entry(live.table_name.clone())
            .or_insert_with(|| TableSchema::new(&live.table_name))
            .add_column(live.column);
    }

    let mut grouped: IndexMap<(String, String), Vec<String>> = IndexMap::new();
    for row in indexes {
        grouped
            .entry((row.table_name, row.index_name))
            .or_default()
            .push(row.column_name);
    }

    for ((table_name, index_name), index_columns) in grouped {
        let Some(table) = tables.get_mut(&table_name) else {
            continue;
        };
        if index_name == PRIMARY_INDEX {
            table.set_primary_key(index_columns);
        } else {
            table.add_unique_index(index_columns);
        }
    }

    let mut snapshot = SchemaSnapshot::new(schema_name);
    for (_, table) in tables {
        snapshot.add_table(table);
    }
    snapshot
}

static COLUMN_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([a-z][a-z0-9 ]*?)\s*(?:\(\s*(\d+)\s*(?:,\s*\d+\s*)?\))?\s*(unsigned)?(?:\s+zerofill)?\s*$")
        .expect("column type pattern is valid")
});

/// Parse a live column type into storage type, length and unsignedness
pub fn parse_column_type(raw: &str, max_length: Option<i64>) -> (StorageType, Option<u32>, bool) {
    let lowered = raw.to_lowercase();
    let Some(captures) = COLUMN_TYPE_RE.captures(&lowered) else {
        return (StorageType::Other(raw.to_string()), None, false);
    };

    let base = captures.get(1).map_or("", |m| m.as_str());
    let declared_length = captures
        .get(2)
        .and_then(|m| m.as_str().parse::<u32>().ok());
    let unsigned = captures.get(3).is_some();

    let storage_type = match base {
        "tinyint" if declared_length == Some(1) => StorageType::Boolean,
        "bool" | "boolean" => StorageType::Boolean,
        "int" | "integer" | "int4" => StorageType::Integer,
        "varchar" | "character varying" | "nvarchar" => StorageType::String,
        "float" | "double" | "double precision" | "real" | "float8" => StorageType::Float,
        "datetime" | "timestamp" | "timestamp without time zone" => StorageType::DateTime,
        "text" | "tinytext" | "mediumtext" | "longtext" | "clob" => StorageType::Text,
        _ => StorageType::Other(raw.to_string()),
    };

    let length = match storage_type {
        StorageType::String => declared_length
            .or_else(|| max_length.and_then(|len| u32::try_from(len).ok())),
        _ => None,
    };

    (storage_type, length, unsigned)
}
