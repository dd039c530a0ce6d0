//! End-to-end chat flow against mock collaborators.
//!
//! The embedding provider, vector index, and generator are replaced with
//! deterministic in-process fakes so the orchestration contracts can be
//! exercised without infrastructure.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use ragchat::error::{EmbeddingError, GenerationError, VectorStoreError};
use ragchat::models::{IndexRecord, IndexingConfig, SourceMatch, SourceSnippet, Turn};
use ragchat::services::embedding::Embedder;
use ragchat::services::vector_store::VectorIndex;
use ragchat::services::{
    ChatService, Generator, InMemoryResponseCache, InMemorySessionStore, IngestionService,
    RetrievalService, SessionStore,
};

const DIM: usize = 8;

/// Deterministic embedding: byte histogram folded into DIM buckets,
/// L2-normalized. Identical text always embeds identically.
struct FakeEmbedder;

fn fake_embed(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    for b in text.bytes() {
        v[b as usize % DIM] += 1.0;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| fake_embed(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(fake_embed(text))
    }

    fn dimension(&self) -> usize {
        DIM
    }

    async fn health_check(&self) -> Result<(), EmbeddingError> {
        Ok(())
    }
}

/// Brute-force in-memory index honoring the VectorIndex contract:
/// idempotent upsert per id, descending-score query, at most k results.
#[derive(Default)]
struct FakeIndex {
    records: Mutex<Vec<IndexRecord>>,
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<(), VectorStoreError> {
        let mut stored = self.records.lock().unwrap();
        for record in records {
            stored.retain(|r| r.id != record.id);
            stored.push(record);
        }
        Ok(())
    }

    async fn query(&self, vector: Vec<f32>, k: u64) -> Result<Vec<SourceMatch>, VectorStoreError> {
        let stored = self.records.lock().unwrap();
        let mut matches: Vec<SourceMatch> = stored
            .iter()
            .map(|r| SourceMatch {
                id: r.id.clone(),
                score: r.vector.iter().zip(&vector).map(|(a, b)| a * b).sum(),
                metadata: r.metadata.clone(),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(k as usize);
        Ok(matches)
    }

    async fn ensure_ready(&self) -> Result<(), VectorStoreError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        Ok(true)
    }

    fn namespace(&self) -> &str {
        "test"
    }
}

/// Generator that counts invocations and echoes a numbered answer.
#[derive(Default)]
struct CountingGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl Generator for CountingGenerator {
    async fn generate(
        &self,
        query: &str,
        _history: &[Turn],
        _sources: &[SourceSnippet],
    ) -> Result<String, GenerationError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("answer #{n} to: {query}"))
    }
}

/// Generator that always fails.
struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(
        &self,
        _query: &str,
        _history: &[Turn],
        _sources: &[SourceSnippet],
    ) -> Result<String, GenerationError> {
        Err(GenerationError::ServerError("status 500: boom".to_string()))
    }
}

fn indexing_config() -> IndexingConfig {
    IndexingConfig {
        chunk_size: 40,
        chunk_overlap: 10,
        ..Default::default()
    }
}

fn temp_doc(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".txt")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

struct Harness {
    ingestion: IngestionService,
    chat: ChatService,
    generator: Arc<CountingGenerator>,
    sessions: Arc<InMemorySessionStore>,
}

fn harness(top_k: u64) -> Harness {
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder);
    let index: Arc<dyn VectorIndex> = Arc::new(FakeIndex::default());
    let generator = Arc::new(CountingGenerator::default());
    let sessions = Arc::new(InMemorySessionStore::new());
    let cache = Arc::new(InMemoryResponseCache::new());

    let ingestion = IngestionService::new(embedder.clone(), index.clone(), indexing_config());
    let retrieval = RetrievalService::new(embedder, index);
    let chat = ChatService::new(
        retrieval,
        generator.clone(),
        sessions.clone(),
        cache,
        top_k,
    );

    Harness {
        ingestion,
        chat,
        generator,
        sessions,
    }
}

#[tokio::test]
async fn ingest_reports_chunk_count() {
    let h = harness(5);
    // 75 chars with size 40 / overlap 10: windows start at 0, 30, 60.
    let doc = temp_doc(&"a".repeat(75));

    let summary = h.ingestion.ingest(doc.path(), Some("guide")).await.unwrap();
    assert_eq!(summary.source_id, "guide");
    assert_eq!(summary.chunks_ingested, 3);
}

#[tokio::test]
async fn ingest_defaults_source_id_to_file_stem() {
    let h = harness(5);
    let doc = temp_doc("short note");

    let summary = h.ingestion.ingest(doc.path(), None).await.unwrap();
    let expected = doc.path().file_stem().unwrap().to_string_lossy();
    assert_eq!(summary.source_id, expected);
    assert_eq!(summary.chunks_ingested, 1);
}

#[tokio::test]
async fn ingest_rejects_missing_and_empty_documents() {
    let h = harness(5);

    let missing = h
        .ingestion
        .ingest(std::path::Path::new("/nonexistent/doc.txt"), None)
        .await;
    assert!(missing.is_err());

    let empty = temp_doc("   \n  ");
    assert!(h.ingestion.ingest(empty.path(), None).await.is_err());
}

#[tokio::test]
async fn chat_returns_bounded_descending_sources() {
    let h = harness(2);
    let doc = temp_doc(&"the quick brown fox jumps over the lazy dog. ".repeat(5));
    h.ingestion.ingest(doc.path(), Some("fox")).await.unwrap();

    let reply = h.chat.chat("s1", "quick brown fox").await.unwrap();
    assert!(!reply.sources.is_empty());
    assert!(reply.sources.len() <= 2);
    for pair in reply.sources.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    // Snippet text comes from the indexed chunk metadata.
    assert!(reply.sources.iter().all(|s| !s.text.is_empty()));
}

#[tokio::test]
async fn identical_turns_invoke_generation_once() {
    let h = harness(3);
    let doc = temp_doc(&"rust is a systems programming language. ".repeat(4));
    h.ingestion.ingest(doc.path(), Some("rust")).await.unwrap();

    let first = h.chat.chat("s1", "what is rust?").await.unwrap();
    let second = h.chat.chat("s1", "what is rust?").await.unwrap();

    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.answer, second.answer);

    // Sources are freshly retrieved both times and identical, since the
    // cache key covers the exact ordered retrieval results.
    let ids = |r: &ragchat::models::ChatReply| {
        r.sources.iter().map(|s| s.id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));

    // Both turns still landed in the session, in order.
    let history = h.sessions.get("s1").await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].content, "what is rust?");
    assert_eq!(history[1].content, first.answer);
}

#[tokio::test]
async fn distinct_sessions_share_the_cache() {
    let h = harness(3);
    let doc = temp_doc(&"alpha beta gamma delta. ".repeat(6));
    h.ingestion.ingest(doc.path(), Some("greek")).await.unwrap();

    h.chat.chat("s1", "alpha?").await.unwrap();
    h.chat.chat("s2", "alpha?").await.unwrap();

    // Same fingerprint, so the second session reuses the cached answer.
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.sessions.get("s1").await.unwrap().len(), 2);
    assert_eq!(h.sessions.get("s2").await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_inputs_are_rejected() {
    let h = harness(3);
    assert!(h.chat.chat("", "hello").await.is_err());
    assert!(h.chat.chat("s1", "   ").await.is_err());
}

#[tokio::test]
async fn failed_generation_leaves_no_partial_state() {
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder);
    let index: Arc<dyn VectorIndex> = Arc::new(FakeIndex::default());
    let sessions = Arc::new(InMemorySessionStore::new());
    let cache = Arc::new(InMemoryResponseCache::new());
    let retrieval = RetrievalService::new(embedder, index);
    let chat = ChatService::new(
        retrieval,
        Arc::new(FailingGenerator),
        sessions.clone(),
        cache,
        3,
    );

    assert!(chat.chat("s1", "anything").await.is_err());
    // No session append, no cached answer.
    assert!(sessions.get("s1").await.unwrap().is_empty());
}
