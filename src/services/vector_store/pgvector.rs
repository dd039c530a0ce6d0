//! Self-hosted k-NN backend on PostgreSQL + pgvector.

use std::time::Duration;

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};

use super::VectorIndex;
use crate::error::VectorStoreError;
use crate::models::{ChunkMetadata, IndexRecord, SourceMatch, VectorStoreConfig};

/// Vector index backed by a pgvector table with an HNSW cosine index.
///
/// The table must exist (with a matching dimension) before first use;
/// `ensure_ready` creates it and is run by the bootstrap command.
pub struct PgVectorBackend {
    pool: PgPool,
    table: String,
    dimension: u64,
}

impl PgVectorBackend {
    pub async fn new(
        config: &VectorStoreConfig,
        dimension: u64,
    ) -> Result<Self, VectorStoreError> {
        if config.url.trim().is_empty() {
            return Err(VectorStoreError::BackendUnavailable(
                "vector_store.url is required for the pgvector backend".to_string(),
            ));
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_max)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.url)
            .await
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        let backend = Self {
            pool,
            table: config.namespace.clone(),
            dimension,
        };

        backend.check_pgvector_extension().await?;

        Ok(backend)
    }

    async fn check_pgvector_extension(&self) -> Result<(), VectorStoreError> {
        let result: Option<(String,)> =
            sqlx::query_as("SELECT extname FROM pg_extension WHERE extname = 'vector'")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        if result.is_none() {
            return Err(VectorStoreError::BackendUnavailable(
                "pgvector extension is not installed. Run: CREATE EXTENSION vector;".to_string(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl VectorIndex for PgVectorBackend {
    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<(), VectorStoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let query = format!(
            r#"
            INSERT INTO {} (id, source_id, chunk_index, content, path, embedding)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                source_id = EXCLUDED.source_id,
                chunk_index = EXCLUDED.chunk_index,
                content = EXCLUDED.content,
                path = EXCLUDED.path,
                embedding = EXCLUDED.embedding
            "#,
            self.table
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        for record in records {
            let embedding = Vector::from(record.vector);

            sqlx::query(&query)
                .bind(&record.id)
                .bind(&record.metadata.source_id)
                .bind(record.metadata.chunk_index as i32)
                .bind(&record.metadata.text)
                .bind(&record.metadata.path)
                .bind(&embedding)
                .execute(&mut *tx)
                .await
                .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn query(&self, vector: Vec<f32>, k: u64) -> Result<Vec<SourceMatch>, VectorStoreError> {
        let embedding = Vector::from(vector);

        let query = format!(
            r#"
            SELECT
                id,
                1 - (embedding <=> $1) AS score,
                source_id,
                chunk_index,
                content,
                path
            FROM {}
            ORDER BY embedding <=> $1
            LIMIT {}
            "#,
            self.table, k
        );

        let rows = sqlx::query(&query)
            .bind(&embedding)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VectorStoreError::QueryError(e.to_string()))?;

        let matches = rows
            .into_iter()
            .map(|row: PgRow| {
                let score: Option<f64> = row.get("score");
                let chunk_index: i32 = row.get("chunk_index");

                SourceMatch {
                    id: row.get("id"),
                    score: score.unwrap_or(0.0) as f32,
                    metadata: ChunkMetadata {
                        source_id: row.get("source_id"),
                        chunk_index: chunk_index as u32,
                        text: row.get("content"),
                        path: row.get("path"),
                    },
                }
            })
            .collect();

        Ok(matches)
    }

    async fn ensure_ready(&self) -> Result<(), VectorStoreError> {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                source_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                path TEXT NOT NULL,
                embedding vector({}) NOT NULL
            )
            "#,
            self.table, self.dimension
        );

        sqlx::query(&create_table)
            .execute(&self.pool)
            .await
            .map_err(|e| VectorStoreError::IndexError(e.to_string()))?;

        let indices = [
            format!(
                "CREATE INDEX IF NOT EXISTS {}_embedding_idx ON {} USING hnsw (embedding vector_cosine_ops)",
                self.table, self.table
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {}_source_id_idx ON {} (source_id)",
                self.table, self.table
            ),
        ];

        for index_sql in &indices {
            sqlx::query(index_sql)
                .execute(&self.pool)
                .await
                .map_err(|e| VectorStoreError::IndexError(e.to_string()))?;
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    fn namespace(&self) -> &str {
        &self.table
    }
}
