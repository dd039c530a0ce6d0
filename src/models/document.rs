use serde::{Deserialize, Serialize};

/// A bounded contiguous segment of a source document, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// Metadata stored alongside every indexed chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_id: String,
    pub chunk_index: u32,
    pub text: String,
    pub path: String,
}

/// A record written to the vector index at ingestion time.
///
/// The vector is expected to be L2-normalized; the index never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

impl IndexRecord {
    /// Globally unique record id: source id, chunk position, random suffix.
    ///
    /// The random suffix avoids collisions when the same document is
    /// re-ingested under the same source id.
    pub fn generate_id(source_id: &str, chunk_index: usize) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}-{}", source_id, chunk_index, &suffix[..8])
    }
}

/// A raw match returned by a vector index query, ordered by score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMatch {
    pub id: String,
    pub score: f32,
    pub metadata: ChunkMetadata,
}

/// A match enriched with the original chunk text, returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSnippet {
    pub id: String,
    pub score: f32,
    pub metadata: ChunkMetadata,
    pub text: String,
}

impl From<SourceMatch> for SourceSnippet {
    fn from(m: SourceMatch) -> Self {
        let text = m.metadata.text.clone();
        Self {
            id: m.id,
            score: m.score,
            metadata: m.metadata,
            text,
        }
    }
}

/// Result of ingesting one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSummary {
    pub source_id: String,
    pub chunks_ingested: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_shape() {
        let id = IndexRecord::generate_id("guide", 3);
        assert!(id.starts_with("guide-3-"));
        assert_eq!(id.len(), "guide-3-".len() + 8);
    }

    #[test]
    fn test_record_ids_do_not_collide_on_reingest() {
        let a = IndexRecord::generate_id("guide", 0);
        let b = IndexRecord::generate_id("guide", 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_snippet_text_comes_from_metadata() {
        let m = SourceMatch {
            id: "guide-0-abcd1234".to_string(),
            score: 0.9,
            metadata: ChunkMetadata {
                source_id: "guide".to_string(),
                chunk_index: 0,
                text: "hello world".to_string(),
                path: "/tmp/guide.md".to_string(),
            },
        };
        let snippet = SourceSnippet::from(m);
        assert_eq!(snippet.text, "hello world");
        assert_eq!(snippet.metadata.text, "hello world");
    }
}
