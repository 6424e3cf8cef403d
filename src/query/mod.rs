//! Query pipeline: retrieve similar movies, then format them with a language
//! model as per-movie recommendations or one summary.

pub mod context;
mod recommend;
mod summarize;

pub use crate::config::OutputMode;
pub use summarize::NO_RESULTS_SUMMARY;

use crate::config::{Prompts, QuerySettings};
use crate::error::{PlotlineError, Result};
use crate::llm::LanguageModel;
use crate::schema::QueryResponse;
use crate::vector_store::{DocumentIndex, MetadataFilter, SearchResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// A single query.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query: String,
    pub k: usize,
    pub filter: MetadataFilter,
    pub mode: OutputMode,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, k: usize, mode: OutputMode) -> Self {
        Self {
            query: query.into(),
            k,
            filter: MetadataFilter::new(),
            mode,
        }
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = filter;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(PlotlineError::InvalidInput("Query text is empty".to_string()));
        }
        self.filter.validate()
    }
}

/// Result of a summary query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResponse {
    pub query: String,
    pub summary: String,
}

/// What a query produces, depending on its [`OutputMode`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    Structured(QueryResponse),
    Summary(SummaryResponse),
}

impl QueryOutput {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Retrieval plus formatting, built once and reused across queries.
pub struct QueryPipeline {
    index: DocumentIndex,
    recommender: Arc<dyn LanguageModel>,
    summarizer: Arc<dyn LanguageModel>,
    prompts: Prompts,
    temperature: f32,
}

impl QueryPipeline {
    pub fn new(
        index: DocumentIndex,
        recommender: Arc<dyn LanguageModel>,
        summarizer: Arc<dyn LanguageModel>,
        settings: &QuerySettings,
    ) -> Self {
        Self {
            index,
            recommender,
            summarizer,
            prompts: Prompts::default(),
            temperature: settings.temperature,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }

    /// Retrieval only.
    pub async fn retrieve(&self, request: &QueryRequest) -> Result<Vec<SearchResult>> {
        request.validate()?;
        self.index
            .similarity_search(&request.query, request.k, &request.filter)
            .await
    }

    /// Retrieve and format.
    #[instrument(skip(self, request), fields(query = %request.query, k = request.k, mode = %request.mode))]
    pub async fn run(&self, request: &QueryRequest) -> Result<QueryOutput> {
        let results = self.retrieve(request).await?;
        info!("Retrieved {} documents", results.len());

        match request.mode {
            OutputMode::Structured => {
                let recommendations = recommend::recommend_all(
                    self.recommender.as_ref(),
                    &self.prompts,
                    self.temperature,
                    &request.query,
                    &results,
                )
                .await?;

                Ok(QueryOutput::Structured(QueryResponse {
                    query: request.query.clone(),
                    recommendations,
                }))
            }
            OutputMode::Summary => {
                let summary = summarize::summarize(
                    self.summarizer.as_ref(),
                    &self.prompts,
                    self.temperature,
                    &request.query,
                    &results,
                )
                .await?;

                Ok(QueryOutput::Summary(SummaryResponse {
                    query: request.query.clone(),
                    summary,
                }))
            }
        }
    }
}
