//! Document ingestion: load, chunk, embed, upsert.

use std::path::Path;
use std::sync::Arc;

use crate::error::IngestError;
use crate::models::{ChunkMetadata, IndexRecord, IndexingConfig, IngestSummary};
use crate::services::chunker::chunk_text;
use crate::services::embedding::Embedder;
use crate::services::vector_store::VectorIndex;
use crate::utils::file::{is_supported_document, read_document};

pub struct IngestionService {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    config: IndexingConfig,
}

impl IngestionService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: IndexingConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// Ingest one document into the vector index.
    ///
    /// The source id defaults to the file's base name without extension.
    /// Every chunk becomes one index record with a globally unique id.
    pub async fn ingest(
        &self,
        path: &Path,
        source_id: Option<&str>,
    ) -> Result<IngestSummary, IngestError> {
        if !path.exists() {
            return Err(IngestError::InvalidInput(format!(
                "path does not exist: {}",
                path.display()
            )));
        }
        if !is_supported_document(path) {
            return Err(IngestError::InvalidInput(format!(
                "unsupported document type: {}",
                path.display()
            )));
        }

        let text = read_document(path, self.config.max_file_size)
            .map_err(|e| IngestError::InvalidInput(format!("{}: {}", path.display(), e)))?;
        if text.trim().is_empty() {
            return Err(IngestError::InvalidInput(
                "document contains no extractable text".to_string(),
            ));
        }

        let chunks = chunk_text(
            &text,
            self.config.chunk_size as usize,
            self.config.chunk_overlap as usize,
        )?;
        if chunks.is_empty() {
            return Err(IngestError::InvalidInput(
                "no chunks generated from document".to_string(),
            ));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;

        let resolved_source_id = match source_id {
            Some(id) => id.to_string(),
            None => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string()),
        };

        let records: Vec<IndexRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, vector)| IndexRecord {
                id: IndexRecord::generate_id(&resolved_source_id, chunk.index),
                vector,
                metadata: ChunkMetadata {
                    source_id: resolved_source_id.clone(),
                    chunk_index: chunk.index as u32,
                    text: chunk.text,
                    path: path.display().to_string(),
                },
            })
            .collect();

        let chunks_ingested = records.len();
        self.index.upsert(records).await?;

        tracing::info!(
            source_id = %resolved_source_id,
            chunks = chunks_ingested,
            "document ingested"
        );

        Ok(IngestSummary {
            source_id: resolved_source_id,
            chunks_ingested,
        })
    }
}
