//! `PostgreSQL` Connection Implementation
//!
//! This module implements `CatalogClient` and `DatabaseConnection` on top of a
//! persistent `tokio-postgres` connection.
//!
//! # Implementation Notes
//! - Uses `tokio-postgres` (async driver, requires tokio runtime)
//! - Each connection owns a spawned task driving the socket; `close` drops the
//!   client and waits for that task to finish
//! - Server errors are reduced to the server's message (no connection strings,
//!   no credentials)
//! - Result values are converted to JSON values so rendering stays type-agnostic

use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config, NoTls, Row};

use crate::engine::{CatalogClient, ConnectionConfig, DatabaseConnection, QueryResult};
use crate::error::{LibraryError, Result};

/// Server-side quoting of utility statements (`%I` identifiers, `%L` literals)
const RENDER_UTILITY_SQL: &str = "SELECT format($1::text, VARIADIC $2::text[])";

/// An open connection to one `PostgreSQL` database
pub struct PgConnection {
    client: Client,
    config: ConnectionConfig,
    driver: JoinHandle<()>,
}

impl PgConnection {
    /// Open a connection using the provided config
    ///
    /// # Errors
    /// Returns `ConnectionFailed` if the server is unreachable, rejects the
    /// credentials, or the database does not exist.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let pg_config = build_pg_config(config)?;

        let (client, connection) = pg_config.connect(NoTls).await.map_err(|e| {
            LibraryError::connection_failed(format!(
                "Connection to '{}' database failed: {}",
                config.database,
                server_message(&e)
            ))
        })?;

        let task_database = config.database.clone();
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(database = %task_database, error = %e, "connection terminated");
            }
        });

        tracing::info!(
            database = %config.database,
            host = %config.host,
            port = config.port,
            "connected"
        );

        Ok(Self { client, config: config.clone(), driver })
    }
}

impl DatabaseConnection for PgConnection {
    fn database(&self) -> &str {
        &self.config.database
    }

    async fn connect_to(&self, database: &str) -> Result<Self> {
        Self::connect(&self.config.with_database(database)).await
    }

    /// Drops the client and waits for the driver task to stop
    async fn close(self) {
        let Self { client, config, driver } = self;
        drop(client);
        if let Err(e) = driver.await {
            tracing::warn!(
                database = %config.database,
                error = %e,
                "connection task did not stop cleanly"
            );
        }
        tracing::info!(database = %config.database, "connection closed");
    }
}

impl CatalogClient for PgConnection {
    async fn batch_execute(&self, sql: &str) -> Result<()> {
        tracing::debug!(database = %self.config.database, "batch_execute");
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| LibraryError::statement_failed(server_message(&e)))
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        tracing::debug!(database = %self.config.database, sql, params = params.len(), "execute");
        self.client
            .execute(sql, params)
            .await
            .map_err(|e| LibraryError::statement_failed(server_message(&e)))
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<QueryResult> {
        tracing::debug!(database = %self.config.database, sql, params = params.len(), "query");
        let stmt = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| LibraryError::query_failed(server_message(&e)))?;

        let rows = self
            .client
            .query(&stmt, params)
            .await
            .map_err(|e| LibraryError::query_failed(server_message(&e)))?;

        let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();

        let mut rows_data = Vec::with_capacity(rows.len());
        for row in &rows {
            rows_data.push(row_to_json(columns.len(), row)?);
        }

        Ok(QueryResult { columns, rows: rows_data })
    }

    async fn render_utility(&self, template: &str, args: &[&str]) -> Result<String> {
        let args: Vec<&str> = args.to_vec();
        let row = self
            .client
            .query_one(RENDER_UTILITY_SQL, &[&template, &args])
            .await
            .map_err(|e| LibraryError::statement_failed(server_message(&e)))?;

        row.try_get::<_, Option<String>>(0)
            .map_err(|e| {
                LibraryError::statement_failed(format!("Failed to render statement: {e}"))
            })?
            .ok_or_else(|| LibraryError::statement_failed("Rendered statement was NULL"))
    }
}

/// Build `tokio-postgres` config from `ConnectionConfig`
fn build_pg_config(config: &ConnectionConfig) -> Result<Config> {
    if config.host.is_empty() {
        return Err(LibraryError::invalid_input("PostgreSQL requires 'host' parameter"));
    }
    if config.user.is_empty() {
        return Err(LibraryError::invalid_input("PostgreSQL requires 'user' parameter"));
    }
    if config.database.is_empty() {
        return Err(LibraryError::invalid_input("PostgreSQL requires 'database' parameter"));
    }

    let mut pg_config = Config::new();
    pg_config
        .host(&config.host)
        .port(config.port)
        .user(&config.user)
        .password(&config.password)
        .dbname(&config.database)
        .application_name("bibliotheca");

    Ok(pg_config)
}

/// Reduce a driver error to the server's message when there is one
fn server_message(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => db.message().to_string(),
        None => err.to_string(),
    }
}

/// Convert a `PostgreSQL` row to a JSON-safe `Vec`
fn row_to_json(width: usize, row: &Row) -> Result<Vec<serde_json::Value>> {
    let mut values = Vec::with_capacity(width);

    for idx in 0..width {
        values.push(postgres_value_to_json(row, idx)?);
    }

    Ok(values)
}

/// Convert `PostgreSQL` value to JSON value
fn postgres_value_to_json(row: &Row, idx: usize) -> Result<serde_json::Value> {
    use tokio_postgres::types::Type;

    let col_type = row.columns()[idx].type_();
    let fail = |e: tokio_postgres::Error| {
        LibraryError::query_failed(format!("Failed to read column {idx} ({col_type}): {e}"))
    };

    let value = match *col_type {
        Type::BOOL => {
            let v: Option<bool> = row.try_get(idx).map_err(fail)?;
            v.map_or(serde_json::Value::Null, serde_json::Value::Bool)
        }

        Type::INT2 => {
            let v: Option<i16> = row.try_get(idx).map_err(fail)?;
            v.map_or(serde_json::Value::Null, |n| serde_json::Value::Number(n.into()))
        }
        Type::INT4 => {
            let v: Option<i32> = row.try_get(idx).map_err(fail)?;
            v.map_or(serde_json::Value::Null, |n| serde_json::Value::Number(n.into()))
        }
        Type::INT8 => {
            let v: Option<i64> = row.try_get(idx).map_err(fail)?;
            v.map_or(serde_json::Value::Null, |n| serde_json::Value::Number(n.into()))
        }

        Type::FLOAT4 => {
            let v: Option<f32> = row.try_get(idx).map_err(fail)?;
            v.and_then(|f| serde_json::Number::from_f64(f64::from(f)))
                .map_or(serde_json::Value::Null, serde_json::Value::Number) // NaN/Infinity as null
        }
        Type::FLOAT8 => {
            let v: Option<f64> = row.try_get(idx).map_err(fail)?;
            v.and_then(serde_json::Number::from_f64)
                .map_or(serde_json::Value::Null, serde_json::Value::Number)
        }

        Type::JSON | Type::JSONB => {
            let v: Option<serde_json::Value> = row.try_get(idx).map_err(fail)?;
            v.unwrap_or(serde_json::Value::Null)
        }

        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            let v: Option<String> = row.try_get(idx).map_err(fail)?;
            v.map_or(serde_json::Value::Null, serde_json::Value::String)
        }

        _ => {
            // The catalog only produces the types above; anything else is
            // surfaced as text when the driver can decode it.
            match row.try_get::<_, Option<String>>(idx) {
                Ok(Some(s)) => serde_json::Value::String(s),
                Ok(None) => serde_json::Value::Null,
                Err(_) => serde_json::Value::String(format!("<{col_type}>")),
            }
        }
    };

    Ok(value)
}
