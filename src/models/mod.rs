mod chat;
mod config;
mod document;

pub use chat::{ChatReply, Role, Turn};
pub use config::{
    ChatConfig, ChatStoreDriver, Config, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_URL,
    DEFAULT_GENERATION_URL, DEFAULT_NAMESPACE, DEFAULT_QDRANT_URL, EmbeddingConfig,
    EmbeddingProviderKind, GenerationConfig, IndexingConfig, VectorDriver, VectorStoreConfig,
};
pub use document::{Chunk, ChunkMetadata, IndexRecord, IngestSummary, SourceMatch, SourceSnippet};
