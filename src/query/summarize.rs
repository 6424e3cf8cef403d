//! Single summary over all retrieved movies.

use super::context::format_documents_for_prompt;
use crate::config::Prompts;
use crate::error::Result;
use crate::llm::{CompletionRequest, LanguageModel};
use crate::vector_store::SearchResult;
use std::collections::HashMap;
use tracing::instrument;

/// Reply used when nothing was retrieved.
pub const NO_RESULTS_SUMMARY: &str = "No relevant movies were found for this search.";

/// Summarize all retrieved plots in one call.
#[instrument(skip_all, fields(count = results.len(), model = model.model()))]
pub async fn summarize(
    model: &dyn LanguageModel,
    prompts: &Prompts,
    temperature: f32,
    query: &str,
    results: &[SearchResult],
) -> Result<String> {
    if results.is_empty() {
        return Ok(NO_RESULTS_SUMMARY.to_string());
    }

    let mut vars = HashMap::new();
    vars.insert("query".to_string(), query.to_string());
    vars.insert("documents".to_string(), format_documents_for_prompt(results));

    let request = CompletionRequest::new(prompts.render_with_custom(&prompts.summarize.user, &vars)?)
        .with_system(prompts.summarize.system.clone())
        .with_temperature(temperature);

    Ok(model.complete(&request).await?.trim().to_string())
}
