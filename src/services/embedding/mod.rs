//! Embedding provider abstraction.
//!
//! One capability trait with two interchangeable implementations selected
//! at startup: a remote HTTP embedding server and an in-process ONNX
//! model. Both produce L2-normalized vectors of the configured dimension.

mod local;
mod remote;

pub use local::LocalEmbedder;
pub use remote::RemoteEmbedder;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EmbeddingError;
use crate::models::{EmbeddingConfig, EmbeddingProviderKind};

/// Capability: text in, fixed-dimension unit vector out.
///
/// Query embedding may differ internally from document embedding
/// (instruction prefixes) but shares the same vector space.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Vector dimension this provider produces.
    fn dimension(&self) -> usize;

    /// Probe the provider; used by the status command.
    async fn health_check(&self) -> Result<(), EmbeddingError>;
}

/// Construct the configured embedding provider. Called once at startup.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.provider {
        EmbeddingProviderKind::Remote => Ok(Arc::new(RemoteEmbedder::new(config)?)),
        EmbeddingProviderKind::Local => Ok(Arc::new(LocalEmbedder::load(config)?)),
    }
}

/// L2-normalize a vector. A zero vector is returned unchanged since it has
/// no direction to preserve.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

/// Reject vectors whose dimension does not match the deployment's
/// configuration. A mismatch means the provider and index disagree, which
/// is a configuration fault, not a per-request condition.
pub(crate) fn check_dimension(vector: &[f32], expected: usize) -> Result<(), EmbeddingError> {
    if vector.len() != expected {
        return Err(EmbeddingError::InvalidResponse(format!(
            "embedding dimension mismatch: got {}, expected {}",
            vector.len(),
            expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_produces_unit_vector() {
        let v = normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_passes_through() {
        assert_eq!(normalize(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_dimension_check() {
        assert!(check_dimension(&[0.1, 0.2], 2).is_ok());
        assert!(check_dimension(&[0.1, 0.2], 3).is_err());
    }
}
