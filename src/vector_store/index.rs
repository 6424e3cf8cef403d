//! Document-level access to a vector store.

use super::{assign_ids, IdStrategy, MetadataFilter, SearchResult, StoredVector, VectorStore};
use crate::data::Document;
use crate::embedding::Embedder;
use crate::error::{PlotlineError, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Documents written per embed-and-upsert round.
const DEFAULT_BATCH_SIZE: usize = 100;

/// Pairs an embedder with a vector store so callers deal in documents and
/// query text rather than vectors.
#[derive(Clone)]
pub struct DocumentIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    id_strategy: IdStrategy,
    batch_size: usize,
}

impl DocumentIndex {
    /// Create a new index.
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            id_strategy: IdStrategy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set how record ids are derived.
    pub fn with_id_strategy(mut self, id_strategy: IdStrategy) -> Self {
        self.id_strategy = id_strategy;
        self
    }

    /// Set how many documents are embedded and written per round.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    /// Embed and store documents. Returns the record id of each input document,
    /// in input order.
    pub async fn add_documents(&self, documents: &[Document]) -> Result<Vec<String>> {
        self.add_documents_with_progress(documents, |_| {}).await
    }

    /// Like [`add_documents`](Self::add_documents), reporting the number of
    /// input documents handled after each round.
    ///
    /// Ids are assigned over the whole input before batching, so sequential ids
    /// run 1..=N across rounds. Documents sharing an id are written once (first
    /// occurrence wins).
    pub async fn add_documents_with_progress<F>(
        &self,
        documents: &[Document],
        on_progress: F,
    ) -> Result<Vec<String>>
    where
        F: FnMut(usize) + Send,
    {
        let (ids, _) = self.write(documents, false, on_progress).await?;
        Ok(ids)
    }

    /// Replace the collection's contents with `documents`. Returns the ids and
    /// the number of records removed.
    ///
    /// The collection is cleared only once the first round has been embedded,
    /// so a failing embedder leaves the existing records in place.
    pub async fn replace_documents_with_progress<F>(
        &self,
        documents: &[Document],
        on_progress: F,
    ) -> Result<(Vec<String>, usize)>
    where
        F: FnMut(usize) + Send,
    {
        self.write(documents, true, on_progress).await
    }

    #[instrument(skip_all, fields(count = documents.len(), collection = self.store.collection(), replace = replace))]
    async fn write<F>(
        &self,
        documents: &[Document],
        replace: bool,
        mut on_progress: F,
    ) -> Result<(Vec<String>, usize)>
    where
        F: FnMut(usize) + Send,
    {
        let ids = assign_ids(documents, self.id_strategy);
        let mut seen = HashSet::with_capacity(ids.len());
        let mut removed = None;
        let mut handled = 0;
        let mut written = 0;

        for (doc_chunk, id_chunk) in documents
            .chunks(self.batch_size)
            .zip(ids.chunks(self.batch_size))
        {
            let fresh: Vec<(&String, &Document)> = id_chunk
                .iter()
                .zip(doc_chunk)
                .filter(|&(id, _)| seen.insert(id.as_str()))
                .collect();

            if !fresh.is_empty() {
                let texts: Vec<String> = fresh.iter().map(|(_, d)| d.text().to_string()).collect();
                let embeddings = self.embedder.embed_batch(&texts).await?;
                if embeddings.len() != fresh.len() {
                    return Err(PlotlineError::Embedding(format!(
                        "Expected {} embeddings, got {}",
                        fresh.len(),
                        embeddings.len()
                    )));
                }

                let records: Vec<StoredVector> = fresh
                    .into_iter()
                    .zip(embeddings)
                    .map(|((id, document), embedding)| StoredVector {
                        id: id.clone(),
                        embedding,
                        document: document.clone(),
                    })
                    .collect();

                if replace && removed.is_none() {
                    removed = Some(self.store.clear().await?);
                }
                written += self.store.upsert_batch(&records).await?;
            }

            handled += doc_chunk.len();
            on_progress(handled);
            debug!("Indexed {}/{} documents", handled, documents.len());
        }

        let removed = match removed {
            Some(n) => n,
            None if replace => self.store.clear().await?,
            None => 0,
        };
        if removed > 0 {
            info!("Removed {} earlier records from '{}'", removed, self.store.collection());
        }

        if written < documents.len() {
            info!(
                "Skipped {} documents whose id repeated an earlier one",
                documents.len() - written
            );
        }
        info!("Wrote {} records to '{}'", written, self.store.collection());

        Ok((ids, removed))
    }

    /// The `k` stored documents nearest to `query`, nearest first, restricted
    /// to those matching `filter`.
    #[instrument(skip(self), fields(collection = self.store.collection()))]
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let mut results = self.store.search(&query_embedding, k, filter).await?;
        results.truncate(k);

        debug!("Retrieved {} documents", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MovieMetadata;
    use crate::testing::{FailingEmbedder, KeywordEmbedder};
    use crate::vector_store::MemoryVectorStore;

    fn doc(title: &str, plot: &str) -> Document {
        let metadata = MovieMetadata {
            title: Some(title.to_string()),
            ..MovieMetadata::default()
        };
        Document::new(plot, metadata).unwrap()
    }

    fn index(strategy: IdStrategy) -> (DocumentIndex, Arc<MemoryVectorStore>, Arc<KeywordEmbedder>) {
        let store = Arc::new(MemoryVectorStore::new("movies"));
        let embedder = Arc::new(KeywordEmbedder::new());
        let index = DocumentIndex::new(store.clone(), embedder.clone()).with_id_strategy(strategy);
        (index, store, embedder)
    }

    fn movies() -> Vec<Document> {
        vec![
            doc("Alien", "space crew creature ship"),
            doc("Heat", "heist detective city crime"),
            doc("Jaws", "shark beach island summer"),
        ]
    }

    #[tokio::test]
    async fn test_sequential_ids_in_input_order() {
        let (index, store, _) = index(IdStrategy::Sequential);
        let ids = index.add_documents(&movies()).await.unwrap();

        assert_eq!(ids, vec!["1", "2", "3"]);
        let second = store.get("2").unwrap().unwrap();
        assert_eq!(second.document.metadata().title.as_deref(), Some("Heat"));
    }

    #[tokio::test]
    async fn test_sequential_ids_span_batches() {
        let (index, store, _) = index(IdStrategy::Sequential);
        let index = index.with_batch_size(2);

        let mut progress = Vec::new();
        let ids = index
            .add_documents_with_progress(&movies(), |n| progress.push(n))
            .await
            .unwrap();

        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(progress, vec![2, 3]);
        assert_eq!(store.document_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_sequential_reingest_overwrites_same_ids() {
        let (index, store, _) = index(IdStrategy::Sequential);
        index.add_documents(&movies()).await.unwrap();
        index
            .add_documents(&[doc("Up", "balloon house old man")])
            .await
            .unwrap();

        // A later batch reuses id "1" and replaces the earlier record.
        assert_eq!(store.document_count().await.unwrap(), 3);
        let first = store.get("1").unwrap().unwrap();
        assert_eq!(first.document.metadata().title.as_deref(), Some("Up"));
    }

    #[tokio::test]
    async fn test_content_hash_reingest_is_idempotent() {
        let (index, store, _) = index(IdStrategy::ContentHash);
        let first = index.add_documents(&movies()).await.unwrap();
        let second = index.add_documents(&movies()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.document_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_replace_swaps_contents() {
        let (index, store, _) = index(IdStrategy::ContentHash);
        index.add_documents(&movies()).await.unwrap();

        let up = [doc("Up", "balloon house old man")];
        let (ids, removed) = index.replace_documents_with_progress(&up, |_| {}).await.unwrap();

        assert_eq!(removed, 3);
        assert_eq!(store.document_count().await.unwrap(), 1);
        assert!(store.get(&ids[0]).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_replace_keeps_records_when_embedding_fails() {
        let store = Arc::new(MemoryVectorStore::new("movies"));
        DocumentIndex::new(store.clone(), Arc::new(KeywordEmbedder::new()))
            .add_documents(&movies())
            .await
            .unwrap();

        let failing = DocumentIndex::new(store.clone(), Arc::new(FailingEmbedder));
        let result = failing
            .replace_documents_with_progress(&[doc("Up", "balloon house old man")], |_| {})
            .await;

        assert!(result.is_err());
        assert_eq!(store.document_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_text_in_batch_written_once() {
        let (index, store, embedder) = index(IdStrategy::ContentHash);
        let docs = vec![
            doc("Alien", "space crew creature ship"),
            doc("Alien (re-release)", "Space crew  creature ship"),
        ];

        let ids = index.add_documents(&docs).await.unwrap();
        assert_eq!(ids[0], ids[1]);
        assert_eq!(store.document_count().await.unwrap(), 1);
        assert_eq!(embedder.texts_embedded(), 1);

        let kept = store.get(&ids[0]).unwrap().unwrap();
        assert_eq!(kept.document.metadata().title.as_deref(), Some("Alien"));
    }

    #[tokio::test]
    async fn test_search_respects_k_and_store_contents() {
        let (index, _, _) = index(IdStrategy::Sequential);
        let docs = movies();
        index.add_documents(&docs).await.unwrap();

        for k in 0..5 {
            let results = index
                .similarity_search("shark island", k, &MetadataFilter::new())
                .await
                .unwrap();
            assert!(results.len() <= k);
            for result in &results {
                assert!(docs.contains(&result.document));
            }
        }

        let top = index
            .similarity_search("shark island", 1, &MetadataFilter::new())
            .await
            .unwrap();
        assert_eq!(top[0].document.metadata().title.as_deref(), Some("Jaws"));
    }

    #[tokio::test]
    async fn test_zero_k_skips_embedding() {
        let (index, _, embedder) = index(IdStrategy::Sequential);
        let results = index
            .similarity_search("anything", 0, &MetadataFilter::new())
            .await
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(embedder.texts_embedded(), 0);
    }

    #[tokio::test]
    async fn test_search_with_filter() {
        let (index, _, _) = index(IdStrategy::Sequential);
        index.add_documents(&movies()).await.unwrap();

        let results = index
            .similarity_search("shark island", 3, &MetadataFilter::new().with("title", "Heat"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "2");
    }
}
