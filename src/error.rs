//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout Bibliotheca.
//! Every error maps to a stable error code used by the JSON output mode.
//!
//! # Error Categories
//! - `ConnectionFailed`: Opening a connection to the admin or catalog database failed
//! - `StatementFailed`: A command-style statement (CALL, CREATE, GRANT, ...) failed
//! - `QueryFailed`: A result-returning statement failed
//! - `InvalidInput`: Malformed console input or missing required values
//! - `ConfigError`: Configuration file or seed-role resolution errors
//! - `ConsoleError`: Reading from or writing to the terminal failed

use thiserror::Error;

/// Main error type for Bibliotheca operations
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Database connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Command-style statement failed
    #[error("SQL execution error: {0}")]
    StatementFailed(String),

    /// Result-returning statement failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// Invalid input or missing required parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error (file not found, invalid JSON, missing env var, etc.)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Terminal interaction failed
    #[error("Console error: {0}")]
    ConsoleError(String),
}

impl LibraryError {
    /// Convert error to error code string for JSON output
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::StatementFailed(_) => "STATEMENT_FAILED",
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ConsoleError(_) => "CONSOLE_ERROR",
        }
    }

    /// Get human-readable error message
    ///
    /// Never contains passwords: statement errors carry the server message only.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a statement failed error
    pub fn statement_failed(message: impl Into<String>) -> Self {
        Self::StatementFailed(message.into())
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a console error
    pub fn console_error(message: impl Into<String>) -> Self {
        Self::ConsoleError(message.into())
    }
}

impl From<dialoguer::Error> for LibraryError {
    fn from(err: dialoguer::Error) -> Self {
        Self::console_error(err.to_string())
    }
}

/// Result type alias for Bibliotheca operations
pub type Result<T> = std::result::Result<T, LibraryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LibraryError::connection_failed("test").error_code(), "CONNECTION_FAILED");
        assert_eq!(LibraryError::statement_failed("test").error_code(), "STATEMENT_FAILED");
        assert_eq!(LibraryError::query_failed("test").error_code(), "QUERY_FAILED");
        assert_eq!(LibraryError::invalid_input("test").error_code(), "INVALID_INPUT");
        assert_eq!(LibraryError::config_error("test").error_code(), "CONFIG_ERROR");
        assert_eq!(LibraryError::console_error("test").error_code(), "CONSOLE_ERROR");
    }

    #[test]
    fn test_error_messages() {
        let err = LibraryError::statement_failed("relation \"book\" does not exist");
        assert_eq!(err.message(), "SQL execution error: relation \"book\" does not exist");

        let err = LibraryError::config_error("Environment variable GUEST_PW not found");
        assert!(err.message().contains("GUEST_PW"));
    }

    #[test]
    fn test_dialoguer_error_becomes_console_error() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stdin closed");
        let err: LibraryError = dialoguer::Error::IO(io).into();
        assert!(matches!(err, LibraryError::ConsoleError(_)));
        assert!(err.message().contains("stdin closed"));
    }
}
