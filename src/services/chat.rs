//! Chat-turn orchestration.
//!
//! One turn runs retrieve -> cache check -> (hit: respond | miss:
//! generate -> cache store) -> session append -> respond. Cache and
//! session writes only happen after generation succeeds, so a failed
//! turn leaves no partial state behind.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::error::ChatError;
use crate::models::{ChatReply, Role, SourceSnippet};
use crate::services::cache::ResponseCache;
use crate::services::generation::Generator;
use crate::services::retrieval::RetrievalService;
use crate::services::session::SessionStore;

pub struct ChatService {
    retrieval: RetrievalService,
    generator: Arc<dyn Generator>,
    sessions: Arc<dyn SessionStore>,
    cache: Arc<dyn ResponseCache>,
    top_k: u64,
}

impl ChatService {
    pub fn new(
        retrieval: RetrievalService,
        generator: Arc<dyn Generator>,
        sessions: Arc<dyn SessionStore>,
        cache: Arc<dyn ResponseCache>,
        top_k: u64,
    ) -> Self {
        Self {
            retrieval,
            generator,
            sessions,
            cache,
            top_k,
        }
    }

    /// Run one chat turn.
    ///
    /// The returned sources always reflect this turn's retrieval. Since
    /// the cache key covers the exact ordered retrieval results, a cache
    /// hit implies the sources match those behind the cached answer.
    pub async fn chat(&self, session_id: &str, query: &str) -> Result<ChatReply, ChatError> {
        if session_id.trim().is_empty() {
            return Err(ChatError::InvalidInput("session_id cannot be empty".to_string()));
        }
        if query.trim().is_empty() {
            return Err(ChatError::InvalidInput("query cannot be empty".to_string()));
        }

        let sources = self.retrieval.search(query, self.top_k).await?;
        let cache_key = build_cache_key(query, &sources);

        if let Some(answer) = self.cache.get(&cache_key).await? {
            tracing::debug!(session_id, "answer served from cache");
            self.sessions.append(session_id, Role::User, query).await?;
            self.sessions
                .append(session_id, Role::Assistant, &answer)
                .await?;
            return Ok(ChatReply { answer, sources });
        }

        let history = self.sessions.get(session_id).await?;
        let answer = self
            .generator
            .generate(query, &history, &sources)
            .await?;

        self.cache.set(&cache_key, &answer).await?;
        self.sessions.append(session_id, Role::User, query).await?;
        self.sessions
            .append(session_id, Role::Assistant, &answer)
            .await?;

        Ok(ChatReply { answer, sources })
    }
}

/// Deterministic retrieval fingerprint.
///
/// Normalized query plus the ordered `id:score` pairs, hashed so the key
/// stays opaque and fixed-length. Any change in ranking or score yields a
/// different key, so index updates invalidate stale cached answers.
pub fn build_cache_key(query: &str, sources: &[SourceSnippet]) -> String {
    let source_ids: Vec<String> = sources
        .iter()
        .map(|s| format!("{}:{:.6}", s.id, s.score))
        .collect();
    let payload = format!(
        "{}|{}",
        query.trim().to_lowercase(),
        source_ids.join("|")
    );
    hex::encode(Sha256::digest(payload.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn snippet(id: &str, score: f32) -> SourceSnippet {
        SourceSnippet {
            id: id.to_string(),
            score,
            metadata: ChunkMetadata::default(),
            text: String::new(),
        }
    }

    #[test]
    fn test_cache_key_is_deterministic() {
        let sources = vec![snippet("a", 0.9), snippet("b", 0.8)];
        assert_eq!(
            build_cache_key("What is Rust?", &sources),
            build_cache_key("What is Rust?", &sources)
        );
    }

    #[test]
    fn test_cache_key_normalizes_query() {
        let sources = vec![snippet("a", 0.9)];
        assert_eq!(
            build_cache_key("  What is Rust? ", &sources),
            build_cache_key("what is rust?", &sources)
        );
    }

    #[test]
    fn test_cache_key_depends_on_order_and_scores() {
        let base = build_cache_key("q", &[snippet("a", 0.9), snippet("b", 0.8)]);
        let reordered = build_cache_key("q", &[snippet("b", 0.8), snippet("a", 0.9)]);
        let rescored = build_cache_key("q", &[snippet("a", 0.9), snippet("b", 0.7)]);

        assert_ne!(base, reordered);
        assert_ne!(base, rescored);
    }

    #[test]
    fn test_cache_key_with_no_sources_is_query_scoped() {
        let a = build_cache_key("q", &[]);
        let b = build_cache_key("q", &[]);
        let c = build_cache_key("other", &[]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        // Fixed-length hex digest.
        assert_eq!(a.len(), 64);
    }
}
