//! Database Connection Types and the Statement Execution Seam
//!
//! This module defines the connection parameters, the `CatalogClient` trait and
//! the `DatabaseConnection` lifecycle trait.
//! Every component that talks to the database (schema provisioning, role
//! provisioning, the record facade) is written against `CatalogClient`, so it
//! can be driven by a live `PostgreSQL` connection or by an in-memory recorder
//! in tests.
//!
//! # Parameter Binding
//! Values never reach SQL text directly:
//! - Routine arguments are bound with `execute`/`query` placeholders (`$1`, `$2`, ...)
//! - Identifiers and secrets in utility statements (CREATE ROLE, GRANT, CREATE DATABASE)
//!   are quoted by the server through `render_utility`, which receives them as bound
//!   arguments to `format()`

use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio_postgres::types::ToSql;

use crate::error::Result;

pub mod postgres;

#[cfg(test)]
pub(crate) mod recording;

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5432;

/// Default administrative database (used for CREATE/DROP DATABASE and CREATE ROLE)
pub const DEFAULT_ADMIN_DATABASE: &str = "postgres";

/// Default catalog database (holds the book table and its routines)
pub const DEFAULT_CATALOG_DATABASE: &str = "library";

/// Connection configuration for a single `PostgreSQL` connection
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Hostname or IP address
    pub host: String,

    /// Port number
    pub port: u16,

    /// Username
    pub user: String,

    /// Password
    /// WARNING: Sensitive data, do not log or include in error messages
    #[serde(skip_serializing, default)]
    pub password: String,

    /// Database name
    pub database: String,
}

impl ConnectionConfig {
    /// Create a new `PostgreSQL` connection config
    #[must_use]
    pub const fn postgres(
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    ) -> Self {
        Self { host, port, user, password, database }
    }

    /// Same server and credentials, different database
    #[must_use]
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self { database: database.into(), ..self.clone() }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Query execution result
///
/// Rows keep the column order of the result set and the row order returned by
/// the server. No limiting or pagination is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in result set
    pub columns: Vec<String>,

    /// Result rows (each row is an array of values matching `columns` order)
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    /// Number of rows returned
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the result set has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Statement execution seam
///
/// Implemented by [`postgres::PgConnection`] for a live server. All methods
/// report server failures as `StatementFailed` (commands) or `QueryFailed`
/// (result-returning statements) carrying the server's message.
pub trait CatalogClient {
    /// Run one or more parameterless statements with the simple query protocol
    ///
    /// Used for DDL and for utility statements produced by `render_utility`.
    fn batch_execute(&self, sql: &str) -> impl Future<Output = Result<()>> + Send;

    /// Execute a command with bound parameters, returning the affected row count
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Execute a result-returning statement with bound parameters
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<QueryResult>> + Send;

    /// Render a utility statement with `format()` semantics
    ///
    /// `%I` placeholders are replaced by quoted identifiers and `%L` by quoted
    /// literals. Arguments travel as bound parameters, never as SQL text.
    fn render_utility(
        &self,
        template: &str,
        args: &[&str],
    ) -> impl Future<Output = Result<String>> + Send;
}

/// An open connection the session can hold, reopen elsewhere and close
///
/// Implemented by [`postgres::PgConnection`]. The session only needs these
/// three lifecycle operations on top of statement execution.
pub trait DatabaseConnection: CatalogClient + Sized + Send + Sync {
    /// Name of the connected database
    fn database(&self) -> &str;

    /// Open a new connection to `database` on the same server with the same
    /// credentials
    ///
    /// # Errors
    /// Returns `ConnectionFailed` if the connection cannot be opened.
    fn connect_to(&self, database: &str) -> impl Future<Output = Result<Self>> + Send;

    /// Close the connection
    fn close(self) -> impl Future<Output = ()> + Send;
}
