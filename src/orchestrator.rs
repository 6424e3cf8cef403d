//! Pipeline orchestrator for Plotline.
//!
//! Wires settings into concrete components and runs ingestion and queries end
//! to end.

use crate::config::{OutputMode, Prompts, Settings};
use crate::data::{create_documents, load_sample};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::llm::{LanguageModel, OpenAIChatModel};
use crate::query::{QueryOutput, QueryPipeline, QueryRequest};
use crate::vector_store::{DocumentIndex, MetadataFilter, PgVectorStore, SearchResult, VectorStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// What to ingest.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub path: PathBuf,
    pub sample_size: usize,
    pub seed: u64,
    /// Clear the collection before writing.
    pub replace: bool,
}

impl IngestOptions {
    /// Options taken from the dataset settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            path: settings.dataset_path(),
            sample_size: settings.dataset.sample_size,
            seed: settings.dataset.seed,
            replace: false,
        }
    }
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub collection: String,
    pub documents: usize,
    /// Distinct record ids written.
    pub unique_ids: usize,
    pub removed: usize,
    pub collection_size: usize,
}

/// The main orchestrator for the Plotline pipeline.
pub struct Orchestrator {
    settings: Settings,
    pipeline: QueryPipeline,
}

impl Orchestrator {
    /// Connect to the vector database and the OpenAI API.
    pub async fn connect(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder = Arc::new(OpenAIEmbedder::new(&settings.openai, &settings.embedding)?);
        let recommender = Arc::new(OpenAIChatModel::new(
            &settings.openai,
            &settings.query.recommend_model,
        )?);
        let summarizer = Arc::new(OpenAIChatModel::new(
            &settings.openai,
            &settings.query.summary_model,
        )?);

        let store = Arc::new(
            PgVectorStore::connect(
                settings.database.connection_url()?,
                &settings.vector_store.collection,
                settings.database.max_connections,
            )
            .await?,
        );

        Ok(Self::with_components(
            settings,
            prompts,
            store,
            embedder,
            recommender,
            summarizer,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        recommender: Arc<dyn LanguageModel>,
        summarizer: Arc<dyn LanguageModel>,
    ) -> Self {
        let index = DocumentIndex::new(store, embedder)
            .with_id_strategy(settings.vector_store.id_strategy)
            .with_batch_size(settings.embedding.batch_size);

        let pipeline = QueryPipeline::new(index, recommender, summarizer, &settings.query)
            .with_prompts(prompts);

        Self { settings, pipeline }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn index(&self) -> &DocumentIndex {
        self.pipeline.index()
    }

    /// Sample the dataset, build documents, embed and store them.
    pub async fn ingest(&self, options: &IngestOptions) -> Result<IngestReport> {
        self.ingest_with_progress(options, |_, _| {}).await
    }

    /// Like [`ingest`](Self::ingest), reporting `(done, total)` after each batch.
    #[instrument(skip(self, on_progress), fields(path = %options.path.display()))]
    pub async fn ingest_with_progress<F>(
        &self,
        options: &IngestOptions,
        mut on_progress: F,
    ) -> Result<IngestReport>
    where
        F: FnMut(usize, usize) + Send,
    {
        let table = load_sample(&options.path, options.sample_size, options.seed)?;
        info!("Sampled {} rows (seed {})", table.len(), options.seed);

        let documents = create_documents(&table)?;
        let total = documents.len();

        let store = self.index().store();
        let progress = |done: usize| on_progress(done, total);
        let (ids, removed) = if options.replace {
            self.index()
                .replace_documents_with_progress(&documents, progress)
                .await?
        } else {
            let ids = self.index().add_documents_with_progress(&documents, progress).await?;
            (ids, 0)
        };

        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();

        let report = IngestReport {
            collection: store.collection().to_string(),
            documents: total,
            unique_ids: unique.len(),
            removed,
            collection_size: store.document_count().await?,
        };
        info!(
            "Ingested {} documents into '{}' ({} records total)",
            report.documents, report.collection, report.collection_size
        );

        Ok(report)
    }

    /// Build a request, filling unset options from the query settings.
    pub fn request(
        &self,
        query: &str,
        k: Option<usize>,
        mode: Option<OutputMode>,
        filter: MetadataFilter,
    ) -> QueryRequest {
        QueryRequest::new(
            query,
            k.unwrap_or(self.settings.query.k),
            mode.unwrap_or(self.settings.query.mode),
        )
        .with_filter(filter)
    }

    /// Retrieve and format.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryOutput> {
        self.pipeline.run(request).await
    }

    /// Retrieve only.
    pub async fn search(&self, request: &QueryRequest) -> Result<Vec<SearchResult>> {
        self.pipeline.retrieve(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdStrategy;
    use crate::testing::{KeywordEmbedder, ScriptedModel};
    use crate::vector_store::MemoryVectorStore;
    use std::io::Write;

    const HEADER: &str = "Release Year,Title,Origin/Ethnicity,Director,Cast,Genre,Wiki Page,Plot";

    fn write_csv(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file
    }

    fn abc_csv() -> tempfile::NamedTempFile {
        write_csv(&[
            r#"1990,A,American,Someone,Someone,drama,https://example.org/A,"A farmer loses his land in a drought.""#,
            r#"1991,B,British,Someone,Someone,comedy,https://example.org/B,"A butler plans a wedding that goes wrong.""#,
            r#"1992,C,Canadian,Someone,Someone,horror,https://example.org/C,"A cabin in the woods hides a creature.""#,
        ])
    }

    fn orchestrator(settings: Settings) -> (Orchestrator, Arc<MemoryVectorStore>, Arc<ScriptedModel>) {
        let store = Arc::new(MemoryVectorStore::new(&settings.vector_store.collection));
        let recommender = Arc::new(ScriptedModel::recommending());
        let orchestrator = Orchestrator::with_components(
            settings,
            Prompts::default(),
            store.clone(),
            Arc::new(KeywordEmbedder::new()),
            recommender.clone(),
            Arc::new(ScriptedModel::replying("summary")),
        );
        (orchestrator, store, recommender)
    }

    fn options(file: &tempfile::NamedTempFile, sample_size: usize) -> IngestOptions {
        IngestOptions {
            path: file.path().to_path_buf(),
            sample_size,
            seed: 42,
            replace: false,
        }
    }

    #[tokio::test]
    async fn test_ingest_then_query() {
        let csv = abc_csv();
        let (orchestrator, _, _) = orchestrator(Settings::default());

        let report = orchestrator.ingest(&options(&csv, 3)).await.unwrap();
        assert_eq!(report.documents, 3);
        assert_eq!(report.collection, "movies");
        assert_eq!(report.collection_size, 3);

        let request = orchestrator.request("a creature in the woods", Some(2), None, MetadataFilter::new());
        let QueryOutput::Structured(response) = orchestrator.query(&request).await.unwrap() else {
            panic!("expected structured output");
        };

        assert_eq!(response.recommendations.len(), 2);
        for rec in &response.recommendations {
            assert!(rec.metadata.title.as_deref().is_some_and(|t| !t.is_empty()));
        }
    }

    #[tokio::test]
    async fn test_single_document_yields_one_recommendation() {
        let csv = abc_csv();
        let (orchestrator, _, recommender) = orchestrator(Settings::default());
        orchestrator.ingest(&options(&csv, 1)).await.unwrap();

        let request = orchestrator.request("anything", Some(5), None, MetadataFilter::new());
        let QueryOutput::Structured(response) = orchestrator.query(&request).await.unwrap() else {
            panic!("expected structured output");
        };

        assert_eq!(response.recommendations.len(), 1);
        assert!(!response.recommendations[0].structured.highlights.is_empty());
        assert_eq!(recommender.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let csv = abc_csv();
        let (orchestrator, store, _) = orchestrator(Settings::default());

        orchestrator.ingest(&options(&csv, 3)).await.unwrap();
        let report = orchestrator.ingest(&options(&csv, 3)).await.unwrap();

        assert_eq!(report.collection_size, 3);
        assert_eq!(store.document_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_sequential_ids_and_replace() {
        let csv = abc_csv();
        let mut settings = Settings::default();
        settings.vector_store.id_strategy = IdStrategy::Sequential;
        let (orchestrator, store, _) = orchestrator(settings);

        orchestrator.ingest(&options(&csv, 3)).await.unwrap();
        assert!(store.get("3").unwrap().is_some());

        let mut replace = options(&csv, 1);
        replace.replace = true;
        let report = orchestrator.ingest(&replace).await.unwrap();
        assert_eq!(report.removed, 3);
        assert_eq!(report.collection_size, 1);
        assert!(store.get("1").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_progress_reports_total() {
        let csv = abc_csv();
        let mut settings = Settings::default();
        settings.embedding.batch_size = 2;
        let (orchestrator, _, _) = orchestrator(settings);

        let mut seen = Vec::new();
        orchestrator
            .ingest_with_progress(&options(&csv, 3), |done, total| seen.push((done, total)))
            .await
            .unwrap();
        assert_eq!(seen, vec![(2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_sample_larger_than_dataset_fails() {
        let csv = abc_csv();
        let (orchestrator, store, _) = orchestrator(Settings::default());

        assert!(orchestrator.ingest(&options(&csv, 10)).await.is_err());
        assert_eq!(store.document_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_request_defaults_from_settings() {
        let mut settings = Settings::default();
        settings.query.k = 7;
        settings.query.mode = OutputMode::Summary;
        let (orchestrator, _, _) = orchestrator(settings);

        let request = orchestrator.request("q", None, None, MetadataFilter::new());
        assert_eq!(request.k, 7);
        assert_eq!(request.mode, OutputMode::Summary);

        let request = orchestrator.request("q", Some(2), Some(OutputMode::Structured), MetadataFilter::new());
        assert_eq!(request.k, 2);
        assert_eq!(request.mode, OutputMode::Structured);
    }
}
