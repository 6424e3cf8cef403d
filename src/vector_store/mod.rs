//! Vector store abstraction for Plotline.
//!
//! Provides a trait-based interface for vector database backends, each scoped
//! to one named collection, and the [`DocumentIndex`] adapter that pairs a
//! backend with an embedder.

mod index;
mod memory;
mod postgres;

pub use crate::config::IdStrategy;
pub use index::DocumentIndex;
pub use memory::MemoryVectorStore;
pub use postgres::PgVectorStore;

use crate::data::{Document, MovieMetadata};
use crate::error::{PlotlineError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A document stored with its embedding.
#[derive(Debug, Clone)]
pub struct StoredVector {
    /// Record id, unique within a collection.
    pub id: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// The embedded document.
    pub document: Document,
}

/// A search result with score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Record id.
    pub id: String,
    /// The matched document.
    pub document: Document,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Equality constraints on document metadata.
///
/// A document matches when every listed key has exactly the given value.
/// An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter(BTreeMap<String, serde_json::Value>);

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Parse `key=value` pairs. `year` values compare as numbers, every other
    /// key as text.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                PlotlineError::InvalidInput(format!(
                    "Filter '{}' must look like key=value",
                    pair
                ))
            })?;
            let (key, value) = (key.trim(), value.trim());
            let value = if key == "year" {
                let year = value.parse::<i64>().map_err(|_| {
                    PlotlineError::InvalidInput(format!("Filter year '{}' is not a number", value))
                })?;
                serde_json::Value::from(year)
            } else {
                serde_json::Value::from(value)
            };
            filter = filter.with(key, value);
        }
        filter.validate()?;
        Ok(filter)
    }

    /// Reject keys outside the movie metadata schema.
    pub fn validate(&self) -> Result<()> {
        match self.0.keys().find(|k| !MovieMetadata::KEYS.contains(&k.as_str())) {
            Some(key) => Err(PlotlineError::InvalidInput(format!(
                "Unknown metadata key '{}' (expected one of: {})",
                key,
                MovieMetadata::KEYS.join(", ")
            ))),
            None => Ok(()),
        }
    }

    /// Whether the metadata satisfies every constraint.
    pub fn matches(&self, metadata: &MovieMetadata) -> bool {
        if self.0.is_empty() {
            return true;
        }
        let value = metadata.to_json();
        self.0
            .iter()
            .all(|(key, expected)| value.get(key) == Some(expected))
    }

    /// Filter as a JSON object (used for JSONB containment).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.0.clone().into_iter().collect())
    }
}

/// Trait for vector store implementations.
///
/// Every operation is scoped to the store's collection.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the collection this store reads and writes.
    fn collection(&self) -> &str;

    /// Insert records, replacing any with the same id. Returns the number written.
    async fn upsert_batch(&self, records: &[StoredVector]) -> Result<usize>;

    /// Up to `limit` records nearest to the query embedding, nearest first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchResult>>;

    /// Number of records in the collection.
    async fn document_count(&self) -> Result<usize>;

    /// Remove every record in the collection. Returns the number removed.
    async fn clear(&self) -> Result<usize>;
}

/// Assign record ids to a batch of documents.
pub fn assign_ids(documents: &[Document], strategy: IdStrategy) -> Vec<String> {
    match strategy {
        IdStrategy::Sequential => (1..=documents.len()).map(|i| i.to_string()).collect(),
        IdStrategy::ContentHash => documents.iter().map(Document::content_id).collect(),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new(text, MovieMetadata::default()).unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
    }

    #[test]
    fn test_sequential_ids() {
        let docs = vec![doc("one"), doc("two"), doc("three")];
        assert_eq!(assign_ids(&docs, IdStrategy::Sequential), vec!["1", "2", "3"]);
        assert!(assign_ids(&[], IdStrategy::Sequential).is_empty());
    }

    #[test]
    fn test_content_ids_follow_text() {
        let docs = vec![doc("one"), doc("two"), doc("One ")];
        let ids = assign_ids(&docs, IdStrategy::ContentHash);
        assert_eq!(ids[0], ids[2]);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_filter_matches() {
        let metadata = MovieMetadata {
            title: Some("Heat".to_string()),
            genre: Some("crime".to_string()),
            year: Some(1995),
            ..MovieMetadata::default()
        };

        assert!(MetadataFilter::new().matches(&metadata));
        assert!(MetadataFilter::new().with("genre", "crime").matches(&metadata));
        assert!(MetadataFilter::new()
            .with("genre", "crime")
            .with("year", 1995)
            .matches(&metadata));
        assert!(!MetadataFilter::new().with("genre", "drama").matches(&metadata));
        assert!(!MetadataFilter::new().with("year", "1995").matches(&metadata));
    }

    #[test]
    fn test_filter_from_pairs() {
        let filter = MetadataFilter::from_pairs(["genre=drama", "year = 1999"]).unwrap();
        assert_eq!(
            filter.to_json(),
            serde_json::json!({"genre": "drama", "year": 1999})
        );

        assert!(MetadataFilter::from_pairs(["genre"]).is_err());
        assert!(MetadataFilter::from_pairs(["year=nineties"]).is_err());
        assert!(MetadataFilter::from_pairs(["director=Mann"]).is_err());
    }

    #[test]
    fn test_numeric_title_filter_stays_text() {
        let filter = MetadataFilter::from_pairs(["title=1917"]).unwrap();
        assert_eq!(filter.to_json(), serde_json::json!({"title": "1917"}));

        let metadata = MovieMetadata {
            title: Some("1917".to_string()),
            year: Some(2019),
            ..MovieMetadata::default()
        };
        assert!(filter.matches(&metadata));
    }
}
