//! Query-time retrieval: embed the query, search the index, map matches
//! to snippets.

use std::sync::Arc;

use crate::error::SearchError;
use crate::models::SourceSnippet;
use crate::services::embedding::Embedder;
use crate::services::vector_store::VectorIndex;

/// Composes the embedding provider and the vector index. Read-only; safe
/// for concurrent use.
#[derive(Clone)]
pub struct RetrievalService {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl RetrievalService {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Return up to `k` snippets relevant to `query`, ordered by
    /// descending similarity.
    pub async fn search(&self, query: &str, k: u64) -> Result<Vec<SourceSnippet>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("query cannot be empty".to_string()));
        }

        let vector = self.embedder.embed_query(query).await?;
        let matches = self.index.query(vector, k).await?;

        tracing::debug!(count = matches.len(), "retrieved matches");

        Ok(matches.into_iter().map(SourceSnippet::from).collect())
    }
}
