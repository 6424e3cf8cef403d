//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::query::context::movie_label;
use crate::vector_store::MetadataFilter;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    k: Option<usize>,
    filter: &[String],
    settings: Settings,
) -> Result<()> {
    let filter = MetadataFilter::from_pairs(filter)?;

    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::connect(settings).await?;
    let request = orchestrator.request(query, k, None, filter);

    let spinner = Output::spinner("Searching...");
    let results = orchestrator.search(&request).await;
    spinner.finish_and_clear();

    match results {
        Ok(results) => {
            if results.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", results.len()));

                for result in &results {
                    let metadata = result.document.metadata();
                    Output::search_result(
                        &movie_label(metadata),
                        result.score,
                        result.document.text(),
                        metadata.url.as_deref(),
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
