//! Bibliotheca - Interactive Book Catalog Client for `PostgreSQL`
//!
//! Bibliotheca manages a small catalog of book records and the database roles
//! allowed to act on it. All record access goes through server-side routines;
//! new roles receive a selectable subset of those routines.
//!
//! # Core Principles
//! - Every value is a bind parameter; identifiers and secrets in utility
//!   statements are quoted server-side
//! - Provisioning is idempotent and runs step by step (no transaction)
//! - Grants are independent: one failure never stops the others
//! - Database errors are reported and the menu keeps running
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`engine`] - Connection config, result sets, `CatalogClient` and `DatabaseConnection`
//! - [`catalog`] - The fixed operation catalog and grant selection parsing
//! - [`schema`] - Table, routine and seed-role provisioning
//! - [`roles`] - Role creation with selective grants
//! - [`records`] - Record operations
//! - [`session`] - Admin and catalog connections, database lifecycle
//! - [`output`] - Table and JSON rendering
//! - [`config`] - Layered configuration
//! - [`console`] - Prompts and numeric input
//! - [`menu`] - The interactive loop
//! - [`logging`] - tracing setup

pub mod catalog;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod logging;
pub mod menu;
pub mod output;
pub mod records;
pub mod roles;
pub mod schema;
pub mod session;

// Re-export commonly used types for convenience
pub use catalog::{parse_selection, Operation, RoutineKind, Selection};
pub use config::{load_with_precedence, FileConfig, Overrides, Settings};
pub use engine::postgres::PgConnection;
pub use engine::{CatalogClient, ConnectionConfig, DatabaseConnection, QueryResult};
pub use error::{LibraryError, Result};
pub use output::{ErrorEnvelope, ErrorInfo, Metadata, OutputFormat, Printer, SuccessEnvelope};
pub use records::{Book, NewBook};
pub use roles::{GrantOutcome, RoleReport, RoleRequest};
pub use schema::{ProvisionReport, SeedRole, SeedRoles};
pub use session::{DatabaseSetup, Session};
