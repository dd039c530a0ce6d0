//! Qdrant vector index backend.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value, VectorParamsBuilder, value::Kind,
};
use uuid::Uuid;

use super::VectorIndex;
use crate::error::VectorStoreError;
use crate::models::{ChunkMetadata, IndexRecord, SourceMatch, VectorStoreConfig};

/// Vector index backed by a Qdrant collection.
///
/// Record ids are arbitrary strings, while Qdrant point ids must be UUIDs.
/// Points therefore get a UUIDv5 derived from the record id, which makes a
/// re-upsert of the same id replace the prior point, and the original id
/// travels in the payload.
pub struct QdrantBackend {
    client: Qdrant,
    collection: String,
    dimension: u64,
}

impl QdrantBackend {
    pub fn new(config: &VectorStoreConfig, dimension: u64) -> Result<Self, VectorStoreError> {
        if config.url.trim().is_empty() {
            return Err(VectorStoreError::BackendUnavailable(
                "vector_store.url is required for the qdrant backend".to_string(),
            ));
        }

        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::BackendUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.namespace.clone(),
            dimension,
        })
    }

    fn point_id(record_id: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, record_id.as_bytes()).to_string()
    }
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> String {
    payload
        .get(key)
        .and_then(|v| match &v.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn payload_u32(payload: &HashMap<String, Value>, key: &str) -> u32 {
    payload
        .get(key)
        .and_then(|v| match &v.kind {
            Some(Kind::IntegerValue(n)) => u32::try_from(*n).ok(),
            _ => None,
        })
        .unwrap_or(0)
}

#[async_trait]
impl VectorIndex for QdrantBackend {
    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<(), VectorStoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = records
            .into_iter()
            .map(|record| {
                let mut payload: HashMap<String, Value> = HashMap::new();
                payload.insert("record_id".to_string(), record.id.clone().into());
                payload.insert("source_id".to_string(), record.metadata.source_id.into());
                payload.insert(
                    "chunk_index".to_string(),
                    i64::from(record.metadata.chunk_index).into(),
                );
                payload.insert("text".to_string(), record.metadata.text.into());
                payload.insert("path".to_string(), record.metadata.path.into());

                PointStruct::new(Self::point_id(&record.id), record.vector, payload)
            })
            .collect();

        let upsert = UpsertPointsBuilder::new(&self.collection, points);

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn query(&self, vector: Vec<f32>, k: u64) -> Result<Vec<SourceMatch>, VectorStoreError> {
        let search = SearchPointsBuilder::new(&self.collection, vector, k).with_payload(true);

        let results = self
            .client
            .search_points(search)
            .await
            .map_err(|e| VectorStoreError::QueryError(e.to_string()))?;

        let matches = results
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload;
                let id = payload_str(&payload, "record_id");
                let metadata = ChunkMetadata {
                    source_id: payload_str(&payload, "source_id"),
                    chunk_index: payload_u32(&payload, "chunk_index"),
                    text: payload_str(&payload, "text"),
                    path: payload_str(&payload, "path"),
                };

                SourceMatch {
                    id,
                    score: point.score,
                    metadata,
                }
            })
            .collect();

        Ok(matches)
    }

    async fn ensure_ready(&self) -> Result<(), VectorStoreError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| VectorStoreError::IndexError(e.to_string()))?;

        if exists {
            return Ok(());
        }

        let create = CreateCollectionBuilder::new(&self.collection)
            .vectors_config(VectorParamsBuilder::new(self.dimension, Distance::Cosine));

        self.client
            .create_collection(create)
            .await
            .map_err(|e| VectorStoreError::IndexError(e.to_string()))?;

        Ok(())
    }

    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    fn namespace(&self) -> &str {
        &self.collection
    }
}
