//! Schema Provisioning
//!
//! Creates the `book` table, (re)defines the catalog routines, bootstraps the
//! two seed roles and grants their fixed privilege sets. `EXECUTE` on the
//! routines is revoked from `PUBLIC`, so only explicit grants allow a role to
//! call them.
//!
//! # Idempotence
//! Provisioning can be run any number of times against the same catalog:
//! - the table is created with `IF NOT EXISTS`
//! - routines use `CREATE OR REPLACE`
//! - seed roles are created only when missing
//! - grants, revokes and `ALTER ROLE ... SUPERUSER` are safe to restate
//!
//! # Failure Mode
//! Steps run one at a time, outside any transaction. The first failing step
//! aborts provisioning and is reported by name; objects created by earlier
//! steps stay in place.

use serde::{Deserialize, Serialize};

use crate::catalog::{
    clear_table_grant_template, clear_table_revoke_public_statement, Operation,
};
use crate::engine::CatalogClient;
use crate::error::{LibraryError, Result};

const CREATE_BOOK_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS book (
    id SERIAL PRIMARY KEY,
    title VARCHAR(255) NOT NULL,
    author VARCHAR(255) NOT NULL,
    year INT NOT NULL
)";

const CREATE_CLEAR_TABLE: &str = r"
CREATE OR REPLACE PROCEDURE ClearTable()
LANGUAGE plpgsql
AS $$
BEGIN
    DELETE FROM book;
END;
$$";

const CREATE_ADD_BOOK: &str = r"
CREATE OR REPLACE PROCEDURE AddBook(p_title VARCHAR(255), p_author VARCHAR(255), p_year INT)
LANGUAGE plpgsql
AS $$
BEGIN
    INSERT INTO book (title, author, year) VALUES (p_title, p_author, p_year);
END;
$$";

const CREATE_FIND_BY_TITLE: &str = r"
CREATE OR REPLACE FUNCTION FindBookByTitle(p_title VARCHAR(255))
RETURNS TABLE(id INT, title VARCHAR(255), author VARCHAR(255), year INT)
LANGUAGE plpgsql
AS $$
BEGIN
    RETURN QUERY SELECT b.id, b.title, b.author, b.year FROM book b WHERE b.title = p_title;
END;
$$";

const CREATE_FIND_BY_AUTHOR: &str = r"
CREATE OR REPLACE FUNCTION FindBookByAuthor(p_author VARCHAR(255))
RETURNS TABLE(id INT, title VARCHAR(255), author VARCHAR(255), year INT)
LANGUAGE plpgsql
AS $$
BEGIN
    RETURN QUERY SELECT b.id, b.title, b.author, b.year FROM book b WHERE b.author = p_author;
END;
$$";

const CREATE_FIND_BY_YEAR: &str = r"
CREATE OR REPLACE FUNCTION FindBookByYear(p_year INT)
RETURNS TABLE(id INT, title VARCHAR(255), author VARCHAR(255), year INT)
LANGUAGE plpgsql
AS $$
BEGIN
    RETURN QUERY SELECT b.id, b.title, b.author, b.year FROM book b WHERE b.year = p_year;
END;
$$";

const CREATE_UPDATE_BOOK: &str = r"
CREATE OR REPLACE PROCEDURE UpdateBook(p_id INT, p_title VARCHAR(255), p_author VARCHAR(255), p_year INT)
LANGUAGE plpgsql
AS $$
BEGIN
    UPDATE book SET title = p_title, author = p_author, year = p_year WHERE book.id = p_id;
END;
$$";

const CREATE_DELETE_BY_TITLE: &str = r"
CREATE OR REPLACE PROCEDURE DeleteBookByTitle(p_title VARCHAR(255))
LANGUAGE plpgsql
AS $$
BEGIN
    DELETE FROM book WHERE book.title = p_title;
END;
$$";

const CREATE_VIEW_ALL: &str = r"
CREATE OR REPLACE FUNCTION ViewAllRecords()
RETURNS TABLE(id INT, title VARCHAR(255), author VARCHAR(255), year INT)
LANGUAGE plpgsql
AS $$
BEGIN
    RETURN QUERY SELECT b.id, b.title, b.author, b.year FROM book b ORDER BY b.id;
END;
$$";

const ROLE_EXISTS_SQL: &str = "SELECT 1 FROM pg_catalog.pg_roles WHERE rolname = $1";

/// DDL for a catalog operation's routine
#[must_use]
pub const fn routine_ddl(op: Operation) -> &'static str {
    match op {
        Operation::Add => CREATE_ADD_BOOK,
        Operation::FindByTitle => CREATE_FIND_BY_TITLE,
        Operation::FindByAuthor => CREATE_FIND_BY_AUTHOR,
        Operation::FindByYear => CREATE_FIND_BY_YEAR,
        Operation::Update => CREATE_UPDATE_BOOK,
        Operation::DeleteByTitle => CREATE_DELETE_BY_TITLE,
        Operation::ViewAll => CREATE_VIEW_ALL,
    }
}

/// A predefined role created at bootstrap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRole {
    /// Role name
    pub name: String,

    /// Login password, used only when the role has to be created
    /// WARNING: Sensitive data, do not log or include in error messages
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl SeedRole {
    /// Create a seed role
    pub fn new(name: impl Into<String>, password: Option<String>) -> Self {
        Self { name: name.into(), password }
    }
}

/// The two predefined roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRoles {
    /// Full control, including superuser rights
    pub admin: SeedRole,

    /// Read-only access plus the search and listing routines
    pub guest: SeedRole,
}

impl Default for SeedRoles {
    fn default() -> Self {
        Self { admin: SeedRole::new("admin", None), guest: SeedRole::new("guest", None) }
    }
}

/// What a provisioning step does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Parameterless DDL
    Ddl(&'static str),

    /// Parameterless statement built from the routine catalog
    Statement(String),

    /// Make sure a seed role exists
    EnsureRole(SeedRole),

    /// Utility statement rendered server-side with quoted arguments
    Utility {
        /// `format()` template
        template: String,
        /// Identifier arguments
        args: Vec<String>,
    },
}

/// One named provisioning step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionStep {
    /// Short description used in progress logs and error messages
    pub description: String,

    /// Action to run
    pub action: StepAction,
}

impl ProvisionStep {
    fn ddl(description: impl Into<String>, sql: &'static str) -> Self {
        Self { description: description.into(), action: StepAction::Ddl(sql) }
    }

    fn statement(description: impl Into<String>, sql: String) -> Self {
        Self { description: description.into(), action: StepAction::Statement(sql) }
    }

    fn utility(description: impl Into<String>, template: impl Into<String>, args: &[&str]) -> Self {
        Self {
            description: description.into(),
            action: StepAction::Utility {
                template: template.into(),
                args: args.iter().map(|a| (*a).to_string()).collect(),
            },
        }
    }
}

/// Summary of a successful provisioning run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    /// Number of steps executed
    pub steps: usize,

    /// Seed roles that did not exist and were created
    pub roles_created: Vec<String>,
}

/// Build the ordered provisioning plan
///
/// The plan only depends on the catalog database name and the seed role names,
/// so it can be inspected without a server.
#[must_use]
pub fn plan(catalog_database: &str, seeds: &SeedRoles) -> Vec<ProvisionStep> {
    let admin = seeds.admin.name.as_str();
    let guest = seeds.guest.name.as_str();

    let mut steps = vec![
        ProvisionStep::ddl("create table book", CREATE_BOOK_TABLE),
        ProvisionStep::ddl("define ClearTable", CREATE_CLEAR_TABLE),
    ];
    for op in Operation::ALL {
        steps.push(ProvisionStep::ddl(format!("define {op}"), routine_ddl(op)));
    }

    steps.push(ProvisionStep::statement(
        "revoke ClearTable from PUBLIC",
        clear_table_revoke_public_statement(),
    ));
    for op in Operation::ALL {
        steps.push(ProvisionStep::statement(
            format!("revoke {op} from PUBLIC"),
            op.revoke_public_statement(),
        ));
    }

    steps.push(ProvisionStep {
        description: format!("ensure role {admin}"),
        action: StepAction::EnsureRole(seeds.admin.clone()),
    });
    steps.push(ProvisionStep {
        description: format!("ensure role {guest}"),
        action: StepAction::EnsureRole(seeds.guest.clone()),
    });

    steps.push(ProvisionStep::utility(
        format!("grant superuser to {admin}"),
        "ALTER ROLE %I WITH SUPERUSER",
        &[admin],
    ));
    steps.push(ProvisionStep::utility(
        format!("grant database privileges to {admin}"),
        "GRANT ALL PRIVILEGES ON DATABASE %I TO %I",
        &[catalog_database, admin],
    ));
    steps.push(ProvisionStep::utility(
        format!("grant table privileges to {admin}"),
        "GRANT ALL PRIVILEGES ON TABLE book TO %I",
        &[admin],
    ));
    steps.push(ProvisionStep::utility(
        format!("grant ClearTable to {admin}"),
        clear_table_grant_template(),
        &[admin],
    ));
    for op in Operation::ALL {
        steps.push(ProvisionStep::utility(
            format!("grant {op} to {admin}"),
            op.grant_template(),
            &[admin],
        ));
    }

    steps.push(ProvisionStep::utility(
        format!("grant table select to {guest}"),
        "GRANT SELECT ON TABLE book TO %I",
        &[guest],
    ));
    for op in Operation::READ_ONLY {
        steps.push(ProvisionStep::utility(
            format!("grant {op} to {guest}"),
            op.grant_template(),
            &[guest],
        ));
    }

    steps
}

/// Provision the catalog schema and seed-role privileges
///
/// `client` must be connected to the catalog database.
///
/// # Errors
/// Returns the first failing step's error, prefixed with the step description.
/// Earlier steps are not rolled back.
pub async fn provision<C: CatalogClient>(
    client: &C,
    catalog_database: &str,
    seeds: &SeedRoles,
) -> Result<ProvisionReport> {
    let steps = plan(catalog_database, seeds);
    let mut report = ProvisionReport::default();

    for step in &steps {
        tracing::debug!(step = %step.description, "provisioning");
        let outcome =
            run_step(client, &step.action).await.map_err(|e| annotate(&step.description, e))?;
        if let Some(created) = outcome {
            report.roles_created.push(created);
        }
        report.steps += 1;
    }

    tracing::info!(
        catalog = catalog_database,
        steps = report.steps,
        roles_created = report.roles_created.len(),
        "schema provisioned"
    );

    Ok(report)
}

/// Run one step; returns the role name when a seed role was created
async fn run_step<C: CatalogClient>(client: &C, action: &StepAction) -> Result<Option<String>> {
    match action {
        StepAction::Ddl(sql) => {
            client.batch_execute(sql).await?;
            Ok(None)
        }
        StepAction::Statement(sql) => {
            client.batch_execute(sql).await?;
            Ok(None)
        }
        StepAction::EnsureRole(role) => ensure_seed_role(client, role).await,
        StepAction::Utility { template, args } => {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            let sql = client.render_utility(template, &args).await?;
            client.batch_execute(&sql).await?;
            Ok(None)
        }
    }
}

/// Create a seed role with LOGIN when it does not exist yet
async fn ensure_seed_role<C: CatalogClient>(client: &C, role: &SeedRole) -> Result<Option<String>> {
    let existing = client.query(ROLE_EXISTS_SQL, &[&role.name]).await?;
    if !existing.is_empty() {
        return Ok(None);
    }

    let password = role.password.as_deref().ok_or_else(|| {
        LibraryError::config_error(format!(
            "Role '{}' does not exist and no password is configured for it",
            role.name
        ))
    })?;

    let sql = client
        .render_utility("CREATE ROLE %I WITH LOGIN PASSWORD %L", &[role.name.as_str(), password])
        .await?;
    client.batch_execute(&sql).await?;

    tracing::info!(role = %role.name, "seed role created");
    Ok(Some(role.name.clone()))
}

fn annotate(step: &str, err: LibraryError) -> LibraryError {
    match err {
        LibraryError::StatementFailed(msg) => {
            LibraryError::statement_failed(format!("{step}: {msg}"))
        }
        LibraryError::QueryFailed(msg) => LibraryError::query_failed(format!("{step}: {msg}")),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recording::{single_column, RecordingClient};
    use pretty_assertions::assert_eq;

    fn seeds_with_passwords() -> SeedRoles {
        SeedRoles {
            admin: SeedRole::new("admin", Some("admin_password".to_string())),
            guest: SeedRole::new("guest", Some("guest_password".to_string())),
        }
    }

    /// Responder that reports every role as already existing
    fn all_roles_exist(sql: &str, _params: &str) -> crate::engine::QueryResult {
        if sql.contains("pg_roles") {
            single_column("?column?", &[serde_json::json!(1)])
        } else {
            crate::engine::QueryResult::default()
        }
    }

    #[test]
    fn test_plan_covers_table_and_all_routines() {
        let steps = plan("library", &SeedRoles::default());
        let ddl: Vec<&str> = steps
            .iter()
            .filter_map(|s| match s.action {
                StepAction::Ddl(sql) => Some(sql),
                _ => None,
            })
            .collect();

        assert_eq!(ddl.len(), 9);
        assert!(ddl[0].contains("CREATE TABLE IF NOT EXISTS book"));
        for sql in &ddl[1..] {
            assert!(sql.contains("CREATE OR REPLACE"), "routine DDL must replace: {sql}");
        }
        for op in Operation::ALL {
            assert!(ddl.iter().any(|sql| sql.contains(&format!("{}(", op.routine_name()))));
        }
    }

    #[test]
    fn test_guest_only_gets_read_only_routines() {
        let steps = plan("library", &SeedRoles::default());
        let guest_grants: Vec<&str> = steps
            .iter()
            .filter(|s| s.description.ends_with("to guest"))
            .map(|s| s.description.as_str())
            .collect();

        assert_eq!(
            guest_grants,
            vec![
                "grant table select to guest",
                "grant FindBookByTitle to guest",
                "grant FindBookByAuthor to guest",
                "grant FindBookByYear to guest",
                "grant ViewAllRecords to guest",
            ]
        );
    }

    #[test]
    fn test_every_routine_is_revoked_from_public_before_grants() {
        let steps = plan("library", &SeedRoles::default());
        let revokes: Vec<(usize, &str)> = steps
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match &s.action {
                StepAction::Statement(sql) => Some((i, sql.as_str())),
                _ => None,
            })
            .collect();
        let first_grant = steps
            .iter()
            .position(|s| s.description.starts_with("grant"))
            .unwrap();

        assert_eq!(revokes.len(), 8);
        assert!(revokes.iter().all(|(i, _)| *i < first_grant));
        assert!(revokes.iter().all(|(_, sql)| sql.ends_with("FROM PUBLIC")));
        assert_eq!(revokes[0].1, "REVOKE EXECUTE ON PROCEDURE ClearTable() FROM PUBLIC");
        for op in Operation::ALL {
            assert!(
                revokes.iter().any(|(_, sql)| *sql == op.revoke_public_statement()),
                "{op} is not revoked from PUBLIC"
            );
        }
    }

    #[tokio::test]
    async fn test_provision_runs_every_step_in_order() {
        let client = RecordingClient::new().responding(all_roles_exist);
        let report = provision(&client, "library", &SeedRoles::default()).await.unwrap();

        assert_eq!(report.steps, plan("library", &SeedRoles::default()).len());
        assert!(report.roles_created.is_empty());

        let statements = client.statements();
        assert!(statements[0].contains("CREATE TABLE IF NOT EXISTS book"));
        assert!(statements.contains(&"ALTER ROLE admin WITH SUPERUSER".to_string()));
        assert!(statements.contains(&"GRANT ALL PRIVILEGES ON DATABASE library TO admin".to_string()));
        assert!(statements.contains(&"GRANT EXECUTE ON PROCEDURE ClearTable() TO admin".to_string()));
        assert!(statements
            .contains(&"GRANT EXECUTE ON FUNCTION FindBookByYear(INT) TO guest".to_string()));
        assert!(!statements
            .iter()
            .any(|s| s.contains("AddBook(VARCHAR, VARCHAR, INT) TO guest")));
    }

    #[tokio::test]
    async fn test_provision_twice_is_idempotent() {
        let client = RecordingClient::new().responding(all_roles_exist);
        let first = provision(&client, "library", &SeedRoles::default()).await.unwrap();
        let second = provision(&client, "library", &SeedRoles::default()).await.unwrap();

        assert_eq!(first, second);
        let statements = client.statements();
        let (a, b) = statements.split_at(statements.len() / 2);
        assert_eq!(a, b);
        assert!(!statements.iter().any(|s| s.starts_with("CREATE ROLE")));
    }

    #[tokio::test]
    async fn test_missing_seed_roles_are_created() {
        let client = RecordingClient::new();
        let report = provision(&client, "library", &seeds_with_passwords()).await.unwrap();

        assert_eq!(report.roles_created, vec!["admin".to_string(), "guest".to_string()]);
        let statements = client.statements();
        assert!(statements
            .contains(&"CREATE ROLE admin WITH LOGIN PASSWORD 'admin_password'".to_string()));
        assert!(statements
            .contains(&"CREATE ROLE guest WITH LOGIN PASSWORD 'guest_password'".to_string()));
    }

    #[tokio::test]
    async fn test_missing_seed_role_without_password_is_config_error() {
        let client = RecordingClient::new();
        let err = provision(&client, "library", &SeedRoles::default()).await.unwrap_err();

        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.message().contains("Role 'admin' does not exist"));
    }

    #[tokio::test]
    async fn test_failure_aborts_at_failing_step() {
        let client = RecordingClient::new()
            .responding(all_roles_exist)
            .failing_on("FUNCTION FindBookByAuthor");
        let err = provision(&client, "library", &SeedRoles::default()).await.unwrap_err();

        assert_eq!(err.error_code(), "STATEMENT_FAILED");
        assert!(err.message().contains("define FindBookByAuthor"));

        let statements = client.statements();
        // table, ClearTable, AddBook, FindBookByTitle, then the failing FindBookByAuthor
        assert_eq!(statements.len(), 5);
        assert!(!statements.iter().any(|s| s.contains("GRANT")));
    }

    #[tokio::test]
    async fn test_identifiers_are_quoted_server_side() {
        let seeds = SeedRoles {
            admin: SeedRole::new("Library Admin", None),
            guest: SeedRole::new("guest", None),
        };
        let client = RecordingClient::new().responding(all_roles_exist);
        provision(&client, "my-library", &seeds).await.unwrap();

        let statements = client.statements();
        assert!(statements.contains(&"ALTER ROLE \"Library Admin\" WITH SUPERUSER".to_string()));
        assert!(statements.contains(
            &"GRANT ALL PRIVILEGES ON DATABASE \"my-library\" TO \"Library Admin\"".to_string()
        ));
    }
}
