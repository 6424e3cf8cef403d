//! Postgres + pgvector vector store implementation.
//!
//! Records live in one shared table keyed by (collection, id); collections are
//! rows in a second table. Similarity is cosine distance computed by pgvector.

use super::{MetadataFilter, SearchResult, StoredVector, VectorStore};
use crate::data::{Document, MovieMetadata};
use crate::error::{PlotlineError, Result};
use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: [&str; 4] = [
    "CREATE EXTENSION IF NOT EXISTS vector",
    r#"
    CREATE TABLE IF NOT EXISTS vector_collections (
        uuid UUID PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        cmetadata JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vector_embeddings (
        collection_id UUID NOT NULL REFERENCES vector_collections(uuid) ON DELETE CASCADE,
        id TEXT NOT NULL,
        embedding vector NOT NULL,
        document TEXT NOT NULL,
        cmetadata JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (collection_id, id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_vector_embeddings_cmetadata ON vector_embeddings USING gin (cmetadata jsonb_path_ops)",
];

/// pgvector-backed store for one collection.
pub struct PgVectorStore {
    pool: PgPool,
    collection: String,
    collection_id: Uuid,
}

#[derive(Debug, FromRow)]
struct EmbeddingRow {
    id: String,
    document: String,
    cmetadata: Json<MovieMetadata>,
    distance: f64,
}

impl TryFrom<EmbeddingRow> for SearchResult {
    type Error = PlotlineError;

    fn try_from(row: EmbeddingRow) -> Result<Self> {
        Ok(SearchResult {
            document: Document::new(row.document, row.cmetadata.0)?,
            id: row.id,
            score: (1.0 - row.distance) as f32,
        })
    }
}

impl PgVectorStore {
    /// Connect, create the schema if needed and resolve the collection.
    #[instrument(skip(url))]
    pub async fn connect(url: &str, collection: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        Self::from_pool(pool, collection).await
    }

    /// Use an existing pool.
    pub async fn from_pool(pool: PgPool, collection: &str) -> Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        let collection_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO vector_collections (uuid, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING uuid
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(collection)
        .fetch_one(&pool)
        .await?;

        info!("Using pgvector collection '{}' ({})", collection, collection_id);

        Ok(Self {
            pool,
            collection: collection.to_string(),
            collection_id,
        })
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert_batch(&self, records: &[StoredVector]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO vector_embeddings (collection_id, id, embedding, document, cmetadata)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (collection_id, id) DO UPDATE SET
                    embedding = EXCLUDED.embedding,
                    document = EXCLUDED.document,
                    cmetadata = EXCLUDED.cmetadata
                "#,
            )
            .bind(self.collection_id)
            .bind(&record.id)
            .bind(Vector::from(record.embedding.clone()))
            .bind(record.document.text())
            .bind(Json(record.document.metadata()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Upserted {} records into '{}'", records.len(), self.collection);
        Ok(records.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let limit = i64::try_from(limit)
            .map_err(|_| PlotlineError::InvalidInput(format!("Search limit {} is too large", limit)))?;

        let rows: Vec<EmbeddingRow> = sqlx::query_as(
            r#"
            SELECT id, document, cmetadata, (embedding <=> $2) AS distance
            FROM vector_embeddings
            WHERE collection_id = $1 AND cmetadata @> $3
            ORDER BY embedding <=> $2
            LIMIT $4
            "#,
        )
        .bind(self.collection_id)
        .bind(Vector::from(query_embedding.to_vec()))
        .bind(Json(filter.to_json()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} matching documents", rows.len());
        rows.into_iter().map(SearchResult::try_from).collect()
    }

    async fn document_count(&self) -> Result<usize> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM vector_embeddings WHERE collection_id = $1")
                .bind(self.collection_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<usize> {
        let result = sqlx::query("DELETE FROM vector_embeddings WHERE collection_id = $1")
            .bind(self.collection_id)
            .execute(&self.pool)
            .await?;

        info!("Removed {} records from '{}'", result.rows_affected(), self.collection);
        Ok(result.rows_affected() as usize)
    }
}
