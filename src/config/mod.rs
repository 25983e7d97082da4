//! Configuration Management
//!
//! This module loads connection defaults and seed-role definitions from JSON
//! files and merges them with command-line overrides.
//!
//! # Configuration Locations
//! - Local: `.bibliotheca/config.json` (per-project, in the working directory)
//! - Global: `~/.config/bibliotheca/config.json` (per-user)
//! - Explicit: `--config <path>` replaces both
//!
//! # Resolution Precedence
//! 1. Command-line flags (highest priority)
//! 2. Local config file
//! 3. Global config file
//! 4. Built-in defaults (`127.0.0.1:5432`, `postgres`, `library`)
//!
//! # Seed Roles
//! The `admin` and `guest` roles are bootstrap data. Their passwords may be
//! stored directly or referenced through an environment variable
//! (`password_env`), which keeps secrets out of shared config files.
//!
//! ```json
//! {
//!   "host": "127.0.0.1",
//!   "port": 5432,
//!   "catalog_database": "library",
//!   "seed_roles": {
//!     "admin": { "name": "admin", "password_env": "LIBRARY_ADMIN_PASSWORD" },
//!     "guest": { "name": "guest", "password_env": "LIBRARY_GUEST_PASSWORD" }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::{
    DEFAULT_ADMIN_DATABASE, DEFAULT_CATALOG_DATABASE, DEFAULT_HOST, DEFAULT_PORT,
};
use crate::error::{LibraryError, Result};
use crate::output::OutputFormat;
use crate::schema::{SeedRole, SeedRoles};

/// Default number of attempts for numeric prompts (year, id)
pub const DEFAULT_YEAR_ATTEMPTS: u32 = 5;

/// Seed role as stored in a config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSeedRole {
    /// Role name (defaults to `admin` / `guest`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Password stored directly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name for password (if not storing password directly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl StoredSeedRole {
    /// Resolve environment variables and return a `SeedRole`
    ///
    /// `password_env` wins over `password` when both are set.
    pub fn resolve(&self, default_name: &str) -> Result<SeedRole> {
        let name = self.name.clone().unwrap_or_else(|| default_name.to_string());

        let password = match &self.password_env {
            Some(env_var) => match std::env::var(env_var) {
                Ok(password) => Some(password),
                Err(_) => {
                    return Err(LibraryError::config_error(format!(
                        "Environment variable {env_var} not found for password of role '{name}'"
                    )));
                }
            },
            None => self.password.clone(),
        };

        Ok(SeedRole::new(name, password))
    }

    fn merge(self, over: Self) -> Self {
        Self {
            name: over.name.or(self.name),
            password: over.password.or(self.password),
            password_env: over.password_env.or(self.password_env),
        }
    }
}

/// Seed roles section of a config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSeedRoles {
    /// Full-control role
    #[serde(default)]
    pub admin: StoredSeedRole,

    /// Read-only role
    #[serde(default)]
    pub guest: StoredSeedRole,
}

/// Contents of one config file; every field is optional so files can layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Server host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Server port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Login user (the password is always prompted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Administrative database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_database: Option<String>,

    /// Catalog database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_database: Option<String>,

    /// Attempts allowed for numeric prompts before the action is abandoned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_attempts: Option<u32>,

    /// Output format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputFormat>,

    /// Predefined roles
    #[serde(default)]
    pub seed_roles: StoredSeedRoles,
}

impl FileConfig {
    /// Layer `over` on top of `self`; fields set in `over` win
    #[must_use]
    pub fn merge(self, over: Self) -> Self {
        Self {
            host: over.host.or(self.host),
            port: over.port.or(self.port),
            user: over.user.or(self.user),
            admin_database: over.admin_database.or(self.admin_database),
            catalog_database: over.catalog_database.or(self.catalog_database),
            year_attempts: over.year_attempts.or(self.year_attempts),
            output: over.output.or(self.output),
            seed_roles: StoredSeedRoles {
                admin: self.seed_roles.admin.merge(over.seed_roles.admin),
                guest: self.seed_roles.guest.merge(over.seed_roles.guest),
            },
        }
    }
}

/// Command-line overrides (highest precedence)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--host`
    pub host: Option<String>,
    /// `--port`
    pub port: Option<u16>,
    /// `--user`
    pub user: Option<String>,
    /// `--admin-database`
    pub admin_database: Option<String>,
    /// `--catalog-database`
    pub catalog_database: Option<String>,
    /// `--json`
    pub output: Option<OutputFormat>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Login user; prompted when absent
    pub user: Option<String>,
    /// Administrative database
    pub admin_database: String,
    /// Catalog database
    pub catalog_database: String,
    /// Attempts allowed for numeric prompts
    pub year_attempts: u32,
    /// Output format
    pub output: OutputFormat,
    /// Predefined roles
    pub seed_roles: SeedRoles,
}

impl Settings {
    /// Apply overrides to a merged file config and fill in defaults
    ///
    /// # Errors
    /// Returns `ConfigError` when a seed role references a missing environment
    /// variable or `year_attempts` is zero.
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self> {
        let year_attempts = file.year_attempts.unwrap_or(DEFAULT_YEAR_ATTEMPTS);
        if year_attempts == 0 {
            return Err(LibraryError::config_error("'year_attempts' must be at least 1"));
        }

        let seed_roles = SeedRoles {
            admin: file.seed_roles.admin.resolve("admin")?,
            guest: file.seed_roles.guest.resolve("guest")?,
        };

        Ok(Self {
            host: overrides.host.or(file.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            user: overrides.user.or(file.user),
            admin_database: overrides
                .admin_database
                .or(file.admin_database)
                .unwrap_or_else(|| DEFAULT_ADMIN_DATABASE.to_string()),
            catalog_database: overrides
                .catalog_database
                .or(file.catalog_database)
                .unwrap_or_else(|| DEFAULT_CATALOG_DATABASE.to_string()),
            year_attempts,
            output: overrides.output.or(file.output).unwrap_or_default(),
            seed_roles,
        })
    }
}

/// Get path to local config file (`.bibliotheca/config.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        LibraryError::config_error(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(".bibliotheca").join("config.json"))
}

/// Get path to global config file (`~/.config/bibliotheca/config.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| LibraryError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join("bibliotheca").join("config.json"))
}

/// Load one config file; a missing file yields an empty config
pub fn load_file(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| LibraryError::config_error(format!("Could not read config file: {e}")))?;

    serde_json::from_str::<FileConfig>(&contents).map_err(|e| {
        LibraryError::config_error(format!("Invalid config file format ({}): {e}", path.display()))
    })
}

/// Load configuration with precedence
///
/// With an explicit path only that file is read, and it must exist. Otherwise
/// the global file is loaded and the local file is layered on top.
pub fn load_with_precedence(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(LibraryError::config_error(format!(
                "Config file '{}' does not exist",
                path.display()
            )));
        }
        return load_file(path);
    }

    let global = match global_config_path() {
        Ok(path) => load_file(&path)?,
        Err(e) => {
            tracing::debug!(error = %e, "no global config directory");
            FileConfig::default()
        }
    };
    let local = load_file(&local_config_path()?)?;

    Ok(global.merge(local))
}
