//! In-memory `CatalogClient` used by unit tests
//!
//! Records every statement it receives and answers queries through a
//! caller-supplied responder. Failures are injected by substring match.
//! Connections opened with `connect_to` share the statement log, the
//! lifecycle log, the failure list and the responder with their origin.

use std::sync::{Arc, Mutex};
use tokio_postgres::types::ToSql;

use crate::engine::{CatalogClient, DatabaseConnection, QueryResult};
use crate::error::{LibraryError, Result};

type Responder = Arc<dyn Fn(&str, &str) -> QueryResult + Send + Sync>;

/// Shared append-only log
#[derive(Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.lock().expect("journal poisoned").push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().expect("journal poisoned").clone()
    }
}

pub(crate) struct RecordingClient {
    database: String,
    log: Journal,
    lifecycle: Journal,
    fail_on: Vec<String>,
    responder: Responder,
}

impl RecordingClient {
    pub(crate) fn new() -> Self {
        Self::on("postgres")
    }

    /// A client that reports `database` as its connected database
    pub(crate) fn on(database: &str) -> Self {
        Self {
            database: database.to_string(),
            log: Journal::default(),
            lifecycle: Journal::default(),
            fail_on: Vec::new(),
            responder: Arc::new(|_, _| QueryResult::default()),
        }
    }

    /// Fail any statement whose text contains `needle`
    ///
    /// `connect_to` checks `"connect <database>"` against the same list.
    pub(crate) fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on.push(needle.to_string());
        self
    }

    /// Answer queries with `f(sql, debug_params)`
    pub(crate) fn responding(
        mut self,
        f: impl Fn(&str, &str) -> QueryResult + Send + Sync + 'static,
    ) -> Self {
        self.responder = Arc::new(f);
        self
    }

    pub(crate) fn statements(&self) -> Vec<String> {
        self.log.entries()
    }

    /// Statement log that outlives this client
    pub(crate) fn statement_log(&self) -> Journal {
        self.log.clone()
    }

    /// `connect <database>` / `close <database>` entries in order
    pub(crate) fn lifecycle(&self) -> Journal {
        self.lifecycle.clone()
    }

    fn check(&self, sql: &str) -> Option<String> {
        self.fail_on
            .iter()
            .find(|needle| sql.contains(needle.as_str()))
            .map(|needle| format!("injected failure on '{needle}'"))
    }
}

impl CatalogClient for RecordingClient {
    async fn batch_execute(&self, sql: &str) -> Result<()> {
        self.log.push(sql.to_string());
        match self.check(sql) {
            Some(msg) => Err(LibraryError::statement_failed(msg)),
            None => Ok(()),
        }
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        self.log.push(format!("{sql} {params:?}"));
        match self.check(sql) {
            Some(msg) => Err(LibraryError::statement_failed(msg)),
            None => Ok(0),
        }
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<QueryResult> {
        let rendered = format!("{params:?}");
        self.log.push(format!("{sql} {rendered}"));
        match self.check(sql) {
            Some(msg) => Err(LibraryError::query_failed(msg)),
            None => Ok((self.responder)(sql, &rendered)),
        }
    }

    async fn render_utility(&self, template: &str, args: &[&str]) -> Result<String> {
        let mut out = String::new();
        let mut args = args.iter();
        let mut chars = template.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch != '%' {
                out.push(ch);
                continue;
            }
            let specifier = chars.next();
            let arg = args
                .next()
                .ok_or_else(|| LibraryError::statement_failed("too few arguments for format()"))?;
            match specifier {
                Some('I') => out.push_str(&quote_ident(arg)),
                Some('L') => out.push_str(&format!("'{}'", arg.replace('\'', "''"))),
                _ => {
                    return Err(LibraryError::statement_failed(
                        "unrecognized format() type specifier",
                    ))
                }
            }
        }
        Ok(out)
    }
}

impl DatabaseConnection for RecordingClient {
    fn database(&self) -> &str {
        &self.database
    }

    async fn connect_to(&self, database: &str) -> Result<Self> {
        let entry = format!("connect {database}");
        if let Some(msg) = self.check(&entry) {
            return Err(LibraryError::connection_failed(msg));
        }
        self.lifecycle.push(entry);

        Ok(Self {
            database: database.to_string(),
            log: self.log.clone(),
            lifecycle: self.lifecycle.clone(),
            fail_on: self.fail_on.clone(),
            responder: Arc::clone(&self.responder),
        })
    }

    async fn close(self) {
        self.lifecycle.push(format!("close {}", self.database));
    }
}

/// Mirror of the server's `quote_ident`: quote only when needed
fn quote_ident(ident: &str) -> String {
    let simple = ident.chars().next().is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && ident.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if simple {
        ident.to_string()
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

/// Build a single-column result with one row per value
pub(crate) fn single_column(name: &str, values: &[serde_json::Value]) -> QueryResult {
    QueryResult {
        columns: vec![name.to_string()],
        rows: values.iter().map(|v| vec![v.clone()]).collect(),
    }
}
