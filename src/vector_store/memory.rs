//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{cosine_similarity, MetadataFilter, SearchResult, StoredVector, VectorStore};
use crate::error::{PlotlineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory vector store for a single collection.
pub struct MemoryVectorStore {
    collection: String,
    records: RwLock<HashMap<String, StoredVector>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            records: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, StoredVector>>> {
        self.records
            .read()
            .map_err(|e| PlotlineError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, StoredVector>>> {
        self.records
            .write()
            .map_err(|e| PlotlineError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Look up a record by id.
    pub fn get(&self, id: &str) -> Result<Option<StoredVector>> {
        Ok(self.read()?.get(id).cloned())
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new("movies")
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn upsert_batch(&self, records: &[StoredVector]) -> Result<usize> {
        let mut store = self.write()?;
        for record in records {
            store.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchResult>> {
        let records = self.read()?;

        let mut results: Vec<SearchResult> = records
            .values()
            .filter(|r| filter.matches(r.document.metadata()))
            .map(|r| SearchResult {
                id: r.id.clone(),
                document: r.document.clone(),
                score: cosine_similarity(query_embedding, &r.embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(limit);

        Ok(results)
    }

    async fn document_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    async fn clear(&self) -> Result<usize> {
        let mut records = self.write()?;
        let removed = records.len();
        records.clear();
        Ok(removed)
    }
}
