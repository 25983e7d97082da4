//! Console Output
//!
//! Every menu action ends with exactly one of: a success line, a result table,
//! or an error line. This module renders all three in either of two formats.
//!
//! # Table Format (default)
//! - Success: a plain status line on stdout
//! - Results: tab-separated header row, then one tab-separated row per record
//! - Errors: a single line on stderr
//!
//! # JSON Format
//! - Success: `{"ok": true, "command": "...", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "command": "...", "error": {"code": "...", "message": "..."}}`

use serde::{Deserialize, Serialize};

use crate::engine::QueryResult;
use crate::error::LibraryError;

/// Output format for results and status lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable lines and tab-separated tables
    #[default]
    Table,
    /// One JSON envelope per action
    Json,
}

/// Success envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    /// Action that was executed (add, find_by_title, create_role, ...)
    pub command: String,

    /// Action-specific data
    pub data: T,

    /// Execution metadata
    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    /// Create a new success envelope
    pub fn new(command: impl Into<String>, data: T, meta: Metadata) -> Self {
        Self { ok: true, command: command.into(), data, meta }
    }
}

/// Error envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    /// Action that was attempted
    pub command: String,

    /// Error information
    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    /// Create error envelope from `LibraryError`
    pub fn from_error(command: impl Into<String>, err: &LibraryError) -> Self {
        Self {
            ok: false,
            command: command.into(),
            error: ErrorInfo { code: err.error_code().to_string(), message: err.message() },
        }
    }
}

/// Error information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g., "STATEMENT_FAILED", "QUERY_FAILED")
    pub code: String,

    /// Human-readable error message
    pub message: String,
}

/// Metadata included in success envelopes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Number of rows returned (for query results, None for other operations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_returned: Option<usize>,
}

impl Metadata {
    /// Metadata with a row count
    #[must_use]
    pub const fn with_rows(rows_returned: usize) -> Self {
        Self { rows_returned: Some(rows_returned) }
    }
}

/// Render a result set as a tab-separated table
///
/// NULL renders as an empty cell; text renders without quotes.
#[must_use]
pub fn render_table(result: &QueryResult) -> String {
    let mut out = result.columns.join("\t");
    out.push('\n');

    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(render_cell).collect();
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }

    out
}

fn render_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Writes action outcomes to stdout/stderr in the configured format
#[derive(Debug, Clone, Copy, Default)]
pub struct Printer {
    format: OutputFormat,
}

impl Printer {
    /// Create a printer for `format`
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Configured format
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a status line for a successful command-style action
    #[must_use]
    pub fn render_success(&self, command: &str, message: &str) -> String {
        match self.format {
            OutputFormat::Table => message.to_string(),
            OutputFormat::Json => to_json(&SuccessEnvelope::new(
                command,
                serde_json::json!({ "message": message }),
                Metadata::default(),
            )),
        }
    }

    /// Render a result set
    #[must_use]
    pub fn render_rows(&self, command: &str, result: &QueryResult) -> String {
        match self.format {
            OutputFormat::Table => render_table(result),
            OutputFormat::Json => {
                to_json(&SuccessEnvelope::new(command, result, Metadata::with_rows(result.len())))
            }
        }
    }

    /// Render arbitrary serializable data (JSON) or a status line (table)
    #[must_use]
    pub fn render_data<T: Serialize>(&self, command: &str, data: &T, message: &str) -> String {
        match self.format {
            OutputFormat::Table => message.to_string(),
            OutputFormat::Json => {
                to_json(&SuccessEnvelope::new(command, data, Metadata::default()))
            }
        }
    }

    /// Render an error line
    #[must_use]
    pub fn render_error(&self, command: &str, err: &LibraryError) -> String {
        match self.format {
            OutputFormat::Table => err.message(),
            OutputFormat::Json => to_json(&ErrorEnvelope::from_error(command, err)),
        }
    }

    /// Print a success line to stdout
    pub fn success(&self, command: &str, message: &str) {
        println!("{}", self.render_success(command, message));
    }

    /// Print a result set to stdout
    pub fn rows(&self, command: &str, result: &QueryResult) {
        print!("{}", ensure_newline(self.render_rows(command, result)));
    }

    /// Print serializable data to stdout
    pub fn data<T: Serialize>(&self, command: &str, data: &T, message: &str) {
        println!("{}", self.render_data(command, data, message));
    }

    /// Print an error line (stderr for tables, stdout envelope for JSON)
    pub fn error(&self, command: &str, err: &LibraryError) {
        match self.format {
            OutputFormat::Table => eprintln!("{}", self.render_error(command, err)),
            OutputFormat::Json => println!("{}", self.render_error(command, err)),
        }
    }
}

fn ensure_newline(mut s: String) -> String {
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        format!(r#"{{"ok":false,"error":{{"code":"SERIALIZATION_FAILED","message":"{e}"}}}}"#)
    })
}
