//! Database connection handling
//!
//! One pool per run, typed by dialect. Statements of a migration plan are
//! sent one at a time, outside of any transaction.

use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{MySql, Pool, Postgres, Sqlite};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{DatabaseConfig, Dialect};
use crate::error::{Error, Result};

const DEFAULT_POOL_SIZE: u32 = 5;
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// A connection pool for one of the supported dialects
#[derive(Debug, Clone)]
pub enum DatabaseConnection {
    Postgres(Pool<Postgres>),
    MySql(Pool<MySql>),
    Sqlite(Pool<Sqlite>),
}

impl DatabaseConnection {
    /// Open a pool for the configured driver
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool_size = config.pool_size.unwrap_or(DEFAULT_POOL_SIZE);
        let timeout =
            Duration::from_secs(config.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS));
        let url = config.url.as_str();

        let connection = match config.driver {
            Dialect::Postgres => PgPoolOptions::new()
                .max_connections(pool_size)
                .acquire_timeout(timeout)
                .connect(url)
                .await
                .map(DatabaseConnection::Postgres),
            Dialect::Mysql => MySqlPoolOptions::new()
                .max_connections(pool_size)
                .acquire_timeout(timeout)
                .connect(url)
                .await
                .map(DatabaseConnection::MySql),
            Dialect::Sqlite => SqlitePoolOptions::new()
                .max_connections(pool_size)
                .acquire_timeout(timeout)
                .connect(url)
                .await
                .map(DatabaseConnection::Sqlite),
        }
        .map_err(|e| {
            Error::DatabaseError(format!(
                "Could not connect to {} database at {}: {}",
                config.driver,
                redact_url(url),
                e
            ))
        })?;

        info!(
            driver = %connection.dialect(),
            url = %redact_url(url),
            pool_size,
            "Connected to database"
        );
        Ok(connection)
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            DatabaseConnection::Postgres(_) => Dialect::Postgres,
            DatabaseConnection::MySql(_) => Dialect::Mysql,
            DatabaseConnection::Sqlite(_) => Dialect::Sqlite,
        }
    }

    /// Run one statement
    pub async fn execute(&self, sql: &str) -> Result<()> {
        debug!(driver = %self.dialect(), sql, "Executing statement");

        match self {
            DatabaseConnection::Postgres(pool) => sqlx::query(sql).execute(pool).await.map(drop)?,
            DatabaseConnection::MySql(pool) => sqlx::query(sql).execute(pool).await.map(drop)?,
            DatabaseConnection::Sqlite(pool) => sqlx::query(sql).execute(pool).await.map(drop)?,
        }
        Ok(())
    }
}

/// Hide the password of a connection URL for logs and error messages
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };

    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
        None => url.to_string(),
    }
}
