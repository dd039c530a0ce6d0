use serde::{Deserialize, Serialize};

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:11411";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_GENERATION_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_NAMESPACE: &str = "ragchat";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,
}

impl Config {
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join("ragchat").join("config.toml"))
    }

    /// Load the configuration from disk, then apply environment overrides.
    ///
    /// Secrets never live in the TOML file; they are picked up from the
    /// environment (a `.env` file is honored via dotenvy in `main`).
    pub fn load() -> Result<Self, crate::error::ConfigError> {
        let mut config = if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self) -> Result<(), crate::error::ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            crate::error::ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("RAGCHAT_EMBEDDING_URL") {
            self.embedding.url = url;
        }
        if let Ok(url) = std::env::var("RAGCHAT_VECTOR_STORE_URL") {
            self.vector_store.url = url;
        }
        if let Ok(key) = std::env::var("RAGCHAT_VECTOR_STORE_API_KEY") {
            self.vector_store.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("RAGCHAT_GENERATION_URL") {
            self.generation.url = url;
        }
        if let Ok(key) = std::env::var("RAGCHAT_GENERATION_API_KEY") {
            self.generation.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("RAGCHAT_STORE_URL") {
            self.chat.store_url = Some(url);
        }
    }

    /// Validate the configuration at startup.
    ///
    /// Misconfiguration is fatal here, never at first request.
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        use crate::error::ConfigError::ValidationError;

        if self.indexing.chunk_size == 0 {
            return Err(ValidationError("chunk_size must be greater than zero".into()));
        }
        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            return Err(ValidationError(format!(
                "chunk_overlap ({}) must be strictly less than chunk_size ({})",
                self.indexing.chunk_overlap, self.indexing.chunk_size
            )));
        }
        if self.embedding.dimension == 0 {
            return Err(ValidationError("embedding dimension must be greater than zero".into()));
        }
        if self.chat.top_k == 0 {
            return Err(ValidationError("top_k must be at least 1".into()));
        }
        if self.vector_store.url.trim().is_empty() {
            return Err(ValidationError("vector_store.url is required".into()));
        }
        if self.vector_store.namespace.trim().is_empty()
            || !self
                .vector_store
                .namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ValidationError(
                "vector_store.namespace must be a non-empty identifier (alphanumeric or '_')"
                    .into(),
            ));
        }
        if self.embedding.provider == EmbeddingProviderKind::Local
            && self.embedding.model_dir.is_none()
        {
            return Err(ValidationError(
                "embedding.model_dir is required when embedding.provider = \"local\"".into(),
            ));
        }
        if self.chat.store == ChatStoreDriver::Postgres && self.chat.store_url.is_none() {
            return Err(ValidationError(
                "chat.store_url is required when chat.store = \"postgres\"".into(),
            ));
        }
        Ok(())
    }
}

/// Which embedding provider implementation to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// HTTP embedding server
    #[default]
    Remote,
    /// In-process ONNX model
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    /// Directory holding model.onnx and tokenizer.json (local provider only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<std::path::PathBuf>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_batch_size() -> u32 {
    8
}

fn default_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_max_tokens() -> u32 {
    512
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Remote,
            url: default_embedding_url(),
            timeout_secs: default_timeout(),
            batch_size: default_batch_size(),
            dimension: default_dimension(),
            model_dir: None,
            max_tokens: default_max_tokens(),
        }
    }
}

/// Which vector index backend to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VectorDriver {
    #[default]
    Qdrant,
    PgVector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub driver: VectorDriver,

    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// Collection name (qdrant) or table name (pgvector).
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_pool_max")]
    pub pool_max: u32,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_pool_max() -> u32 {
    5
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            driver: VectorDriver::Qdrant,
            url: default_qdrant_url(),
            namespace: default_namespace(),
            api_key: None,
            pool_max: default_pool_max(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_generation_url")]
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_generation_url() -> String {
    DEFAULT_GENERATION_URL.to_string()
}

fn default_generation_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_generation_url(),
            api_key: None,
            model: default_generation_model(),
            timeout_secs: default_timeout(),
            temperature: default_temperature(),
        }
    }
}

/// Which session/cache store implementation to construct at startup.
///
/// The in-memory store lives for the process only and is not safe across
/// multiple service instances; use postgres for shared deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatStoreDriver {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default)]
    pub store: ChatStoreDriver,

    /// Postgres URL for the durable session store and response cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_url: Option<String>,

    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    #[serde(default = "default_cache_ttl")]
    pub response_cache_ttl_secs: u64,
}

fn default_top_k() -> u32 {
    5
}

fn default_session_ttl() -> u64 {
    86_400
}

fn default_cache_ttl() -> u64 {
    1_800
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            store: ChatStoreDriver::Memory,
            store_url: None,
            session_ttl_secs: default_session_ttl(),
            response_cache_ttl_secs: default_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Overlap between consecutive chunks in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_chunk_size() -> u32 {
    1000
}

fn default_chunk_overlap() -> u32 {
    120
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_file_size: default_max_file_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.embedding.url, DEFAULT_EMBEDDING_URL);
        assert_eq!(config.vector_store.namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let mut config = Config::default();
        config.indexing.chunk_size = 10;
        config.indexing.chunk_overlap = 10;
        assert!(config.validate().is_err());

        config.indexing.chunk_size = 100;
        config.indexing.chunk_overlap = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_postgres_store_requires_url() {
        let mut config = Config::default();
        config.chat.store = ChatStoreDriver::Postgres;
        assert!(config.validate().is_err());

        config.chat.store_url = Some("postgres://localhost/ragchat".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_local_provider_requires_model_dir() {
        let mut config = Config::default();
        config.embedding.provider = EmbeddingProviderKind::Local;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_namespace_must_be_identifier() {
        let mut config = Config::default();
        config.vector_store.namespace = "bad name;".to_string();
        assert!(config.validate().is_err());
    }
}
