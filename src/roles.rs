//! Role Provisioning
//!
//! Creates a new login role and grants it a caller-selected subset of the
//! operation catalog.
//!
//! # Grant Semantics
//! - One `GRANT EXECUTE` per selected operation, in selection order
//! - Grants are independent: a failing grant is recorded and the remaining
//!   grants are still attempted
//! - Nothing is rolled back; successful grants stay in effect
//! - If `CREATE ROLE` itself fails, no grants are attempted

use serde::Serialize;

use crate::catalog::{parse_selection, Operation, Selection};
use crate::engine::CatalogClient;
use crate::error::{LibraryError, Result};

/// A request to create a role
#[derive(Clone)]
pub struct RoleRequest {
    /// Role name
    pub name: String,

    /// Login password
    /// WARNING: Sensitive data, do not log or include in error messages
    pub password: String,
}

impl RoleRequest {
    /// Build a request, rejecting empty names and passwords
    ///
    /// # Errors
    /// Returns `InvalidInput` when either value is empty after trimming the name.
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        let password = password.into();

        if name.is_empty() {
            return Err(LibraryError::invalid_input("Role name cannot be empty"));
        }
        if password.is_empty() {
            return Err(LibraryError::invalid_input("Role password cannot be empty"));
        }

        Ok(Self { name, password })
    }
}

impl std::fmt::Debug for RoleRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleRequest")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outcome of a single grant
#[derive(Debug, Serialize)]
pub struct GrantOutcome {
    /// Operation that was granted
    pub operation: Operation,

    /// `None` on success, the server's message on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GrantOutcome {
    /// Whether the grant took effect
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a role provisioning run
#[derive(Debug, Serialize)]
pub struct RoleReport {
    /// Name of the created role
    pub role: String,

    /// One entry per attempted grant, in selection order
    pub grants: Vec<GrantOutcome>,

    /// Non-numeric selection tokens that were skipped
    pub skipped_tokens: Vec<String>,
}

impl RoleReport {
    /// Operations whose grant succeeded
    #[must_use]
    pub fn granted(&self) -> Vec<Operation> {
        self.grants.iter().filter(|g| g.succeeded()).map(|g| g.operation).collect()
    }

    /// Number of grants that failed
    #[must_use]
    pub fn failed(&self) -> usize {
        self.grants.iter().filter(|g| !g.succeeded()).count()
    }
}

/// Create the role with LOGIN and the requested password
///
/// # Errors
/// Returns `StatementFailed` when the server rejects the statement (for
/// example, the role already exists).
pub async fn create_role<C: CatalogClient>(client: &C, request: &RoleRequest) -> Result<()> {
    let sql = client
        .render_utility(
            "CREATE ROLE %I WITH LOGIN PASSWORD %L",
            &[request.name.as_str(), request.password.as_str()],
        )
        .await?;
    client.batch_execute(&sql).await?;

    tracing::info!(role = %request.name, "role created");
    Ok(())
}

/// Grant each operation to `role`, collecting one outcome per operation
///
/// Never short-circuits: every operation is attempted.
pub async fn grant_operations<C: CatalogClient>(
    client: &C,
    role: &str,
    operations: &[Operation],
) -> Vec<GrantOutcome> {
    let mut outcomes = Vec::with_capacity(operations.len());

    for &operation in operations {
        let result = grant_one(client, role, operation).await;
        let error = match result {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(role, operation = %operation, error = %e, "grant failed");
                Some(e.message())
            }
        };
        outcomes.push(GrantOutcome { operation, error });
    }

    outcomes
}

async fn grant_one<C: CatalogClient>(client: &C, role: &str, operation: Operation) -> Result<()> {
    let sql = client.render_utility(&operation.grant_template(), &[role]).await?;
    client.batch_execute(&sql).await
}

/// Create a role and grant the operations named by `selection_input`
///
/// `selection_input` is a comma-separated list of 1-based catalog numbers.
/// Out-of-range numbers are dropped silently; non-numeric tokens are skipped
/// and listed in the report.
///
/// # Errors
/// Fails only when the role itself cannot be created.
pub async fn provision_role<C: CatalogClient>(
    client: &C,
    request: &RoleRequest,
    selection_input: &str,
) -> Result<RoleReport> {
    let Selection { operations, out_of_range, invalid } = parse_selection(selection_input);
    if !out_of_range.is_empty() {
        tracing::debug!(tokens = ?out_of_range, "selection numbers outside the catalog dropped");
    }

    create_role(client, request).await?;
    let grants = grant_operations(client, &request.name, &operations).await;

    let report = RoleReport { role: request.name.clone(), grants, skipped_tokens: invalid };
    tracing::info!(
        role = %report.role,
        granted = report.granted().len(),
        failed = report.failed(),
        "role provisioned"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recording::RecordingClient;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_role_request_validation() {
        assert!(RoleRequest::new("reader", "pw").is_ok());
        assert_eq!(
            RoleRequest::new("  ", "pw").unwrap_err().error_code(),
            "INVALID_INPUT"
        );
        assert!(RoleRequest::new("reader", "")
            .unwrap_err()
            .message()
            .contains("password cannot be empty"));
        assert_eq!(RoleRequest::new(" reader ", "pw").unwrap().name, "reader");
    }

    #[test]
    fn test_role_request_debug_redacts_password() {
        let request = RoleRequest::new("reader", "topsecret").unwrap();
        assert!(!format!("{request:?}").contains("topsecret"));
    }

    #[tokio::test]
    async fn test_mixed_selection_grants_only_valid_operations() {
        let client = RecordingClient::new();
        let request = RoleRequest::new("clerk", "pw").unwrap();

        let report = provision_role(&client, &request, "1,3,9,abc,5").await.unwrap();

        assert_eq!(
            report.granted(),
            vec![Operation::Add, Operation::FindByAuthor, Operation::Update]
        );
        assert_eq!(report.skipped_tokens, vec!["abc".to_string()]);
        assert_eq!(report.failed(), 0);

        insta::assert_snapshot!(client.statements().join("\n"), @r"
        CREATE ROLE clerk WITH LOGIN PASSWORD 'pw'
        GRANT EXECUTE ON PROCEDURE AddBook(VARCHAR, VARCHAR, INT) TO clerk
        GRANT EXECUTE ON FUNCTION FindBookByAuthor(VARCHAR) TO clerk
        GRANT EXECUTE ON PROCEDURE UpdateBook(INT, VARCHAR, VARCHAR, INT) TO clerk
        ");
    }

    #[tokio::test]
    async fn test_failed_grant_does_not_stop_the_loop() {
        let client = RecordingClient::new().failing_on("FindBookByTitle");
        let request = RoleRequest::new("clerk", "pw").unwrap();

        let report = provision_role(&client, &request, "2,4,7").await.unwrap();

        assert_eq!(report.grants.len(), 3);
        assert!(!report.grants[0].succeeded());
        assert_eq!(report.granted(), vec![Operation::FindByYear, Operation::ViewAll]);
        assert_eq!(report.failed(), 1);
        assert_eq!(client.statements().len(), 4);
    }

    #[tokio::test]
    async fn test_create_failure_skips_grants() {
        let client = RecordingClient::new().failing_on("CREATE ROLE");
        let request = RoleRequest::new("clerk", "pw").unwrap();

        let err = provision_role(&client, &request, "1,2").await.unwrap_err();

        assert_eq!(err.error_code(), "STATEMENT_FAILED");
        assert_eq!(client.statements().len(), 1);
    }

    #[tokio::test]
    async fn test_role_name_and_password_are_quoted() {
        let client = RecordingClient::new();
        let request = RoleRequest::new("clerk; DROP TABLE book", "p'w").unwrap();

        let report = provision_role(&client, &request, "7").await.unwrap();

        assert_eq!(report.granted(), vec![Operation::ViewAll]);
        let statements = client.statements();
        assert_eq!(
            statements[0],
            "CREATE ROLE \"clerk; DROP TABLE book\" WITH LOGIN PASSWORD 'p''w'"
        );
        assert_eq!(
            statements[1],
            "GRANT EXECUTE ON FUNCTION ViewAllRecords() TO \"clerk; DROP TABLE book\""
        );
    }

    #[tokio::test]
    async fn test_empty_selection_creates_role_without_grants() {
        let client = RecordingClient::new();
        let request = RoleRequest::new("nobody", "pw").unwrap();

        let report = provision_role(&client, &request, "").await.unwrap();

        assert!(report.grants.is_empty());
        assert_eq!(client.statements().len(), 1);
    }
}
