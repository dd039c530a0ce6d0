//! Vector index abstraction layer.
//!
//! One trait over two interchangeable backends: a Qdrant collection
//! (cosine over pre-normalized vectors) and a self-hosted pgvector k-NN
//! table. Selection happens once at startup; business logic never
//! branches on the backend identity afterwards.

mod pgvector;
mod qdrant;

pub use pgvector::PgVectorBackend;
pub use qdrant::QdrantBackend;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{IndexRecord, SourceMatch, VectorDriver, VectorStoreConfig};

/// Abstract trait for vector index operations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records. Idempotent per record id; a no-op on
    /// empty input.
    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<(), VectorStoreError>;

    /// Nearest-neighbor search. Returns at most `k` matches ordered by
    /// descending similarity score.
    async fn query(&self, vector: Vec<f32>, k: u64) -> Result<Vec<SourceMatch>, VectorStoreError>;

    /// Create the backing collection/table with the configured dimension
    /// and cosine metric. Run out-of-band by the bootstrap command.
    async fn ensure_ready(&self) -> Result<(), VectorStoreError>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// The namespace (collection or table) this index is scoped to.
    fn namespace(&self) -> &str;
}

/// Create the configured vector index backend. Called once at startup;
/// the handle is a shared singleton safe for concurrent use.
pub async fn build_vector_index(
    config: &VectorStoreConfig,
    dimension: u64,
) -> Result<Arc<dyn VectorIndex>, VectorStoreError> {
    match config.driver {
        VectorDriver::Qdrant => Ok(Arc::new(QdrantBackend::new(config, dimension)?)),
        VectorDriver::PgVector => Ok(Arc::new(PgVectorBackend::new(config, dimension).await?)),
    }
}
