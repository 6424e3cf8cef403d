//! Query command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{OutputMode, Settings};
use crate::orchestrator::Orchestrator;
use crate::query::QueryOutput;
use crate::vector_store::MetadataFilter;
use anyhow::Result;
use std::path::PathBuf;

/// Run the query command.
///
/// The result is printed to stdout as JSON. `save` names a file to also write
/// it to; an empty string means the configured output file.
pub async fn run_query(
    query: &str,
    k: Option<usize>,
    mode: Option<&str>,
    filter: &[String],
    save: Option<&str>,
    settings: Settings,
) -> Result<()> {
    let mode = mode
        .map(|m| m.parse::<OutputMode>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;
    let filter = MetadataFilter::from_pairs(filter)?;

    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let save_path = save.map(|path| {
        if path.is_empty() {
            Settings::expand_path(&settings.query.output_file)
        } else {
            PathBuf::from(path)
        }
    });

    let orchestrator = Orchestrator::connect(settings).await?;
    let request = orchestrator.request(query, k, mode, filter);

    let spinner = Output::spinner("Finding movies...");
    let output = orchestrator.query(&request).await;
    spinner.finish_and_clear();

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            Output::error(&format!("Query failed: {}", e));
            return Err(e.into());
        }
    };

    println!("{}", output.to_json()?);

    if let Some(path) = save_path {
        std::fs::write(&path, output.to_json()?)?;
        Output::success(&format!("Saved result to {}", path.display()));
    }

    if let QueryOutput::Structured(response) = &output {
        if response.recommendations.is_empty() {
            Output::warning("No movies matched your query.");
        }
        for rec in &response.recommendations {
            Output::recommendation(rec);
        }
    }

    Ok(())
}
