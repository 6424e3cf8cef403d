//! Per-movie structured recommendations.

use crate::config::Prompts;
use crate::error::Result;
use crate::llm::{CompletionRequest, LanguageModel};
use crate::schema::{FinalRecommendation, RecommendationFromLlm};
use crate::vector_store::SearchResult;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Ask the model why each retrieved movie fits `query`.
///
/// Documents are handled one at a time, in retrieval order. The first failed
/// call or malformed reply aborts the whole batch.
#[instrument(skip_all, fields(count = results.len(), model = model.model()))]
pub async fn recommend_all(
    model: &dyn LanguageModel,
    prompts: &Prompts,
    temperature: f32,
    query: &str,
    results: &[SearchResult],
) -> Result<Vec<FinalRecommendation>> {
    let mut recommendations = Vec::with_capacity(results.len());

    for result in results {
        let metadata = result.document.metadata();

        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        vars.insert("title".to_string(), metadata.display_title().to_string());
        vars.insert("plot".to_string(), result.document.text().to_string());

        let request = CompletionRequest::new(prompts.render_with_custom(&prompts.recommend.user, &vars)?)
            .with_system(prompts.recommend.system.clone())
            .with_temperature(temperature)
            .with_schema(RecommendationFromLlm::json_schema());

        let reply = model.complete(&request).await?;
        let structured = RecommendationFromLlm::from_json(&reply)?;
        debug!("Recommended '{}' with {} highlights", metadata.display_title(), structured.highlights.len());

        recommendations.push(FinalRecommendation {
            id: result.id.clone(),
            metadata: metadata.clone(),
            structured,
        });
    }

    Ok(recommendations)
}
