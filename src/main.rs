//! Plotline CLI entry point.

use anyhow::Result;
use clap::Parser;
use plotline::cli::commands::{self, IngestArgs};
use plotline::cli::{Cli, Commands, Output};
use plotline::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        Output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Load configuration
    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("plotline={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Execute command
    match cli.command {
        Commands::Init => {
            commands::run_init(&settings).await?;
        }

        Commands::Ingest {
            csv,
            sample_size,
            seed,
            sequential_ids,
            skip_bootstrap,
            replace,
        } => {
            let args = IngestArgs {
                csv,
                sample_size,
                seed,
                sequential_ids,
                skip_bootstrap,
                replace,
            };
            commands::run_ingest(args, settings).await?;
        }

        Commands::Query {
            query,
            k,
            mode,
            filter,
            save,
        } => {
            commands::run_query(&query, k, mode.as_deref(), &filter, save.as_deref(), settings)
                .await?;
        }

        Commands::Search { query, k, filter } => {
            commands::run_search(&query, k, &filter, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(&host, port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, &settings, &config_path)?;
        }
    }

    Ok(())
}
