//! Session
//!
//! Owns the two connections the program holds for its lifetime: the
//! administrative connection (create/drop database) and the catalog
//! connection (schema, records, roles). The catalog connection is optional
//! because "Delete Database" closes it before dropping the database.

use serde::Serialize;

use crate::engine::postgres::PgConnection;
use crate::engine::{CatalogClient, ConnectionConfig, DatabaseConnection};
use crate::error::{LibraryError, Result};
use crate::schema::{self, ProvisionReport, SeedRoles};

const DATABASE_EXISTS_SQL: &str = "SELECT 1 FROM pg_database WHERE datname = $1::text";
const CREATE_DATABASE_TEMPLATE: &str = "CREATE DATABASE %I";
const DROP_DATABASE_TEMPLATE: &str = "DROP DATABASE IF EXISTS %I";

/// Outcome of "Create Database"
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseSetup {
    /// Catalog database name
    pub database: String,

    /// False when the database already existed
    pub created: bool,

    /// Provisioning summary
    pub provisioning: ProvisionReport,
}

/// Admin and catalog connections for one program run
pub struct Session<C = PgConnection> {
    catalog_database: String,
    seed_roles: SeedRoles,
    admin: C,
    catalog: Option<C>,
}

impl Session<PgConnection> {
    /// Connect to the administrative and catalog databases
    ///
    /// `admin_config` carries the server, credentials and admin database; the
    /// catalog connection reuses it with `catalog_database`.
    ///
    /// # Errors
    /// Returns `ConnectionFailed` if either connection cannot be opened.
    pub async fn open(
        admin_config: &ConnectionConfig,
        catalog_database: impl Into<String>,
        seed_roles: SeedRoles,
    ) -> Result<Self> {
        let admin = PgConnection::connect(admin_config).await?;
        Self::with_admin(admin, catalog_database, seed_roles).await
    }
}

impl<C: DatabaseConnection> Session<C> {
    /// Open the catalog connection next to an already open admin connection
    ///
    /// # Errors
    /// Returns `ConnectionFailed` if the catalog connection cannot be opened.
    /// The admin connection is closed before returning.
    pub async fn with_admin(
        admin: C,
        catalog_database: impl Into<String>,
        seed_roles: SeedRoles,
    ) -> Result<Self> {
        let catalog_database = catalog_database.into();

        let catalog = match admin.connect_to(&catalog_database).await {
            Ok(conn) => conn,
            Err(e) => {
                admin.close().await;
                return Err(e);
            }
        };

        Ok(Self { catalog_database, seed_roles, admin, catalog: Some(catalog) })
    }

    /// Catalog connection
    ///
    /// # Errors
    /// Returns `InvalidInput` after the catalog database has been deleted.
    pub fn catalog(&self) -> Result<&C> {
        self.catalog
            .as_ref()
            .ok_or_else(|| LibraryError::invalid_input("catalog database is not connected"))
    }

    /// Catalog database name
    #[must_use]
    pub fn catalog_database(&self) -> &str {
        &self.catalog_database
    }

    /// Create the catalog database if absent, reconnect to it and provision
    /// the schema
    ///
    /// # Errors
    /// Returns the failing statement's error. A failure during provisioning
    /// leaves the database and whatever objects were created before it.
    pub async fn create_database(&mut self) -> Result<DatabaseSetup> {
        let created = ensure_database(&self.admin, &self.catalog_database).await?;

        if let Some(old) = self.catalog.take() {
            old.close().await;
        }
        let catalog = self.admin.connect_to(&self.catalog_database).await?;
        let catalog = &*self.catalog.insert(catalog);

        let provisioning =
            schema::provision(catalog, &self.catalog_database, &self.seed_roles).await?;

        Ok(DatabaseSetup { database: self.catalog_database.clone(), created, provisioning })
    }

    /// Close the catalog connection and drop the catalog database
    ///
    /// # Errors
    /// Returns `StatementFailed` if the server refuses the drop (for example,
    /// another session is still connected). The catalog connection stays
    /// closed either way.
    pub async fn drop_database(&mut self) -> Result<()> {
        if let Some(catalog) = self.catalog.take() {
            catalog.close().await;
        }
        drop_database(&self.admin, &self.catalog_database).await
    }

    /// Close the catalog connection (if open), then the admin connection
    ///
    /// Returns the names of the closed databases in closing order.
    pub async fn close(self) -> Vec<String> {
        let Self { admin, catalog, .. } = self;
        let mut closed = Vec::with_capacity(2);

        if let Some(catalog) = catalog {
            closed.push(catalog.database().to_string());
            catalog.close().await;
        }
        closed.push(admin.database().to_string());
        admin.close().await;

        closed
    }
}

/// Create `database` unless it already exists; returns whether it was created
pub async fn ensure_database<C: CatalogClient>(client: &C, database: &str) -> Result<bool> {
    let existing = client.query(DATABASE_EXISTS_SQL, &[&database]).await?;
    if !existing.is_empty() {
        tracing::info!(database, "database already exists");
        return Ok(false);
    }

    let sql = client.render_utility(CREATE_DATABASE_TEMPLATE, &[database]).await?;
    client.batch_execute(&sql).await?;
    tracing::info!(database, "database created");
    Ok(true)
}

/// Drop `database` if it exists
pub async fn drop_database<C: CatalogClient>(client: &C, database: &str) -> Result<()> {
    let sql = client.render_utility(DROP_DATABASE_TEMPLATE, &[database]).await?;
    client.batch_execute(&sql).await?;
    tracing::info!(database, "database dropped");
    Ok(())
}
