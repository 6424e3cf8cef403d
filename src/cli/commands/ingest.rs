//! Ingest command implementation.

use super::init::bootstrap;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{IdStrategy, Settings};
use crate::orchestrator::{IngestOptions, Orchestrator};
use anyhow::Result;

/// Ingest command arguments.
#[derive(Debug, Default)]
pub struct IngestArgs {
    pub csv: Option<String>,
    pub sample_size: Option<usize>,
    pub seed: Option<u64>,
    pub sequential_ids: bool,
    pub skip_bootstrap: bool,
    pub replace: bool,
}

/// Run the ingest command.
pub async fn run_ingest(args: IngestArgs, mut settings: Settings) -> Result<()> {
    if args.sequential_ids {
        settings.vector_store.id_strategy = IdStrategy::Sequential;
    }

    let mut options = IngestOptions::from_settings(&settings);
    if let Some(csv) = &args.csv {
        options.path = Settings::expand_path(csv);
    }
    if let Some(sample_size) = args.sample_size {
        options.sample_size = sample_size;
    }
    if let Some(seed) = args.seed {
        options.seed = seed;
    }
    options.replace = args.replace;

    let checks = preflight::check(Operation::Ingest, &settings)
        .and_then(|_| preflight::check_dataset(&options.path));
    if let Err(e) = checks {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if !args.skip_bootstrap {
        let status = bootstrap(&settings).await?;
        if !status.is_ready() {
            anyhow::bail!("Aborting ingestion: {}", status);
        }
    }

    let orchestrator = Orchestrator::connect(settings).await?;

    Output::info(&format!(
        "Sampling {} rows from {} (seed {})",
        options.sample_size,
        options.path.display(),
        options.seed
    ));

    let progress = Output::progress_bar(options.sample_size as u64, "embedding plots");
    let result = orchestrator
        .ingest_with_progress(&options, |done, total| {
            progress.set_length(total as u64);
            progress.set_position(done as u64);
        })
        .await;
    progress.finish_and_clear();

    match result {
        Ok(report) => {
            Output::success(&format!(
                "Stored {} documents in '{}'",
                report.documents, report.collection
            ));
            if report.removed > 0 {
                Output::kv("Removed first", &report.removed.to_string());
            }
            if report.unique_ids < report.documents {
                Output::kv("Duplicate plots", &(report.documents - report.unique_ids).to_string());
            }
            Output::kv("Collection size", &report.collection_size.to_string());
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Ingestion failed: {}", e));
            Err(e.into())
        }
    }
}
