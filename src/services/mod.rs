pub mod cache;
pub mod chat;
pub mod chunker;
pub mod embedding;
pub mod generation;
pub mod ingest;
pub mod retrieval;
pub mod session;
pub mod vector_store;

pub use cache::{InMemoryResponseCache, PgResponseCache, ResponseCache};
pub use chat::{ChatService, build_cache_key};
pub use chunker::chunk_text;
pub use embedding::{Embedder, LocalEmbedder, RemoteEmbedder, build_embedder};
pub use generation::{ChatCompletionsGenerator, Generator};
pub use ingest::IngestionService;
pub use retrieval::RetrievalService;
pub use session::{InMemorySessionStore, PgSessionStore, SessionStore};
pub use vector_store::{PgVectorBackend, QdrantBackend, VectorIndex, build_vector_index};

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use crate::error::StoreError;
use crate::models::{ChatConfig, ChatStoreDriver};

/// Construct the configured session store and response cache.
///
/// The Postgres variants share one connection pool. Called once at
/// startup; the handles are shared singletons.
pub async fn build_chat_stores(
    config: &ChatConfig,
) -> Result<(Arc<dyn SessionStore>, Arc<dyn ResponseCache>), StoreError> {
    match config.store {
        ChatStoreDriver::Memory => Ok((
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryResponseCache::new()),
        )),
        ChatStoreDriver::Postgres => {
            let url = config.store_url.as_deref().ok_or_else(|| {
                StoreError::ConnectionError("chat.store_url is not configured".to_string())
            })?;

            let pool = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(10))
                .connect(url)
                .await
                .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

            let sessions = PgSessionStore::new(
                pool.clone(),
                Duration::from_secs(config.session_ttl_secs),
            );
            let cache = PgResponseCache::new(
                pool,
                Duration::from_secs(config.response_cache_ttl_secs),
            );

            sessions.ensure_schema().await?;
            cache.ensure_schema().await?;

            Ok((Arc::new(sessions), Arc::new(cache)))
        }
    }
}
