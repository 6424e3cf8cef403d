//! Database bootstrap.
//!
//! Makes sure the target database exists before ingestion connects to it.
//! Failures to reach or modify the server are reported as a
//! [`BootstrapStatus`] so the caller can decide whether to continue.

use crate::config::DatabaseSettings;
use crate::error::{PlotlineError, Result};
use async_trait::async_trait;
use regex::Regex;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::fmt;
use tracing::{info, instrument, warn};

/// SQLSTATE raised by `CREATE DATABASE` when the name is taken.
const DUPLICATE_DATABASE: &str = "42P04";
/// SQLSTATE for insufficient privilege.
const INSUFFICIENT_PRIVILEGE: &str = "42501";
/// SQLSTATE class for invalid authorization.
const INVALID_AUTHORIZATION_CLASS: &str = "28";

/// Outcome of [`ensure_database_exists`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapStatus {
    Created,
    AlreadyExists,
    ConnectionFailed(String),
    PermissionDenied(String),
}

impl BootstrapStatus {
    /// Whether the database is usable afterwards.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Created | Self::AlreadyExists)
    }
}

impl fmt::Display for BootstrapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "database created"),
            Self::AlreadyExists => write!(f, "database already exists"),
            Self::ConnectionFailed(reason) => write!(f, "connection failed: {}", reason),
            Self::PermissionDenied(reason) => write!(f, "permission denied: {}", reason),
        }
    }
}

/// Failure reported by a [`DatabaseCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Connection(String),
    PermissionDenied(String),
    DuplicateDatabase,
}

impl CatalogError {
    fn into_status(self) -> BootstrapStatus {
        match self {
            Self::Connection(reason) => BootstrapStatus::ConnectionFailed(reason),
            Self::PermissionDenied(reason) => BootstrapStatus::PermissionDenied(reason),
            Self::DuplicateDatabase => BootstrapStatus::AlreadyExists,
        }
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &error {
            match db.code().as_deref() {
                Some(DUPLICATE_DATABASE) => return Self::DuplicateDatabase,
                Some(INSUFFICIENT_PRIVILEGE) => return Self::PermissionDenied(db.message().to_string()),
                Some(code) if code.starts_with(INVALID_AUTHORIZATION_CLASS) => {
                    return Self::PermissionDenied(db.message().to_string())
                }
                _ => {}
            }
        }
        Self::Connection(error.to_string())
    }
}

/// The server-side list of databases.
#[async_trait]
pub trait DatabaseCatalog: Send + Sync {
    async fn database_exists(&self, name: &str) -> std::result::Result<bool, CatalogError>;

    /// Create a database. `name` has passed [`validate_database_name`].
    async fn create_database(&self, name: &str) -> std::result::Result<(), CatalogError>;
}

/// Catalog of a Postgres server, reached through its administrative database.
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub async fn connect(admin_url: &str) -> std::result::Result<Self, CatalogError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(admin_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl DatabaseCatalog for PgCatalog {
    async fn database_exists(&self, name: &str) -> std::result::Result<bool, CatalogError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_database(&self, name: &str) -> std::result::Result<(), CatalogError> {
        // Identifiers cannot be bound as parameters.
        sqlx::query(&format!("CREATE DATABASE \"{}\"", name))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Check that `name` is safe to interpolate into DDL.
pub fn validate_database_name(name: &str) -> Result<()> {
    let pattern = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .map_err(|e| PlotlineError::Config(format!("Invalid name pattern: {}", e)))?;

    if pattern.is_match(name) {
        Ok(())
    } else {
        Err(PlotlineError::Config(format!(
            "Invalid database name '{}': use letters, digits and underscores, not starting with a digit",
            name
        )))
    }
}

/// Create `name` through `catalog` unless it already exists.
#[instrument(skip(catalog))]
pub async fn ensure_database(catalog: &dyn DatabaseCatalog, name: &str) -> Result<BootstrapStatus> {
    validate_database_name(name)?;

    let status = match catalog.database_exists(name).await {
        Ok(true) => BootstrapStatus::AlreadyExists,
        Ok(false) => match catalog.create_database(name).await {
            Ok(()) => BootstrapStatus::Created,
            Err(e) => e.into_status(),
        },
        Err(e) => e.into_status(),
    };

    match &status {
        BootstrapStatus::Created => info!("Created database '{}'", name),
        BootstrapStatus::AlreadyExists => info!("Database '{}' already exists", name),
        other => warn!("Could not prepare database '{}': {}", name, other),
    }

    Ok(status)
}

/// Ensure the configured database exists on the server named by the
/// connection URL.
///
/// Returns `Err` only for configuration problems (missing URL, invalid name).
pub async fn ensure_database_exists(settings: &DatabaseSettings) -> Result<BootstrapStatus> {
    validate_database_name(&settings.name)?;
    let admin_url = settings.admin_url()?;

    let catalog = match PgCatalog::connect(&admin_url).await {
        Ok(catalog) => catalog,
        Err(e) => {
            let status = e.into_status();
            warn!("Bootstrap could not reach the server: {}", status);
            return Ok(status);
        }
    };

    let status = ensure_database(&catalog, &settings.name).await;
    catalog.close().await;
    status
}
