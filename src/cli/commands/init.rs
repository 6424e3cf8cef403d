//! Init command - first-run database setup.

use crate::bootstrap::{ensure_database_exists, BootstrapStatus};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::{PgVectorStore, VectorStore};
use anyhow::Result;

/// Run the init command.
pub async fn run_init(settings: &Settings) -> Result<()> {
    Output::header("Plotline Setup");

    if let Err(e) = preflight::check(Operation::Init, settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let status = bootstrap(settings).await?;
    if !status.is_ready() {
        anyhow::bail!("Database '{}' is not available: {}", settings.database.name, status);
    }

    let spinner = Output::spinner("Preparing vector collection...");
    let store = PgVectorStore::connect(
        settings.database.connection_url()?,
        &settings.vector_store.collection,
        settings.database.max_connections,
    )
    .await;
    spinner.finish_and_clear();

    let store = store?;
    let count = store.document_count().await?;

    Output::success(&format!(
        "Collection '{}' is ready ({} documents)",
        store.collection(),
        count
    ));
    if count == 0 {
        Output::info("Run 'plotline ingest' to load movie plots.");
    }

    Ok(())
}

/// Ensure the database exists, reporting the outcome.
pub(crate) async fn bootstrap(settings: &Settings) -> Result<BootstrapStatus> {
    let spinner = Output::spinner(&format!("Checking database '{}'...", settings.database.name));
    let status = ensure_database_exists(&settings.database).await;
    spinner.finish_and_clear();

    let status = status?;
    match &status {
        BootstrapStatus::Created => {
            Output::success(&format!("Created database '{}'", settings.database.name))
        }
        BootstrapStatus::AlreadyExists => {
            Output::success(&format!("Database '{}' already exists", settings.database.name))
        }
        BootstrapStatus::ConnectionFailed(reason) => {
            Output::error(&format!("Could not connect to Postgres: {}", reason));
            Output::info("Check DB_CONNECTION and that the server is running.");
        }
        BootstrapStatus::PermissionDenied(reason) => {
            Output::error(&format!("Permission denied: {}", reason));
            Output::info("The configured role needs CREATEDB, or create the database manually.");
        }
    }

    Ok(status)
}
