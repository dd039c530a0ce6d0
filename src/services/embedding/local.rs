//! In-process ONNX embedding model.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ndarray::ArrayViewD;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};

use super::{Embedder, normalize};
use crate::error::{EmbeddingError, ModelError};
use crate::models::EmbeddingConfig;

const QUERY_INSTRUCTION: &str =
    "Instruct: Given a search query, retrieve relevant passages\nQuery: ";

/// Embedding provider running an ONNX model in-process.
///
/// Inference is CPU-bound and synchronous; the async trait methods hand it
/// to the blocking thread pool so chat turns keep making progress.
pub struct LocalEmbedder {
    model: Arc<OnnxModel>,
}

impl LocalEmbedder {
    pub fn load(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let model_dir = config.model_dir.as_deref().ok_or_else(|| {
            ModelError::NotFound("embedding.model_dir is not configured".to_string())
        })?;
        let model = OnnxModel::load(config, model_dir)?;
        Ok(Self {
            model: Arc::new(model),
        })
    }

    async fn embed_blocking(
        &self,
        texts: Vec<String>,
        is_query: bool,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let model = Arc::clone(&self.model);
        let vectors = tokio::task::spawn_blocking(move || model.embed(&texts, is_query))
            .await
            .map_err(|e| ModelError::InferenceError(format!("embedding task failed: {e}")))??;
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.embed_blocking(texts.to_vec(), false).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let vectors = self.embed_blocking(vec![text.to_string()], true).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding output".to_string()))
    }

    fn dimension(&self) -> usize {
        self.model.dimension
    }

    async fn health_check(&self) -> Result<(), EmbeddingError> {
        // The model is loaded eagerly; reaching here means it is usable.
        Ok(())
    }
}

/// Tokenizer plus ONNX session for one model directory.
///
/// `Session::run` takes `&mut self`, so inference is serialized behind a
/// mutex. Each call tokenizes the batch, pads it to the longest sequence,
/// runs the session, and reduces the output to one unit vector per input.
struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
}

impl OnnxModel {
    fn load(config: &EmbeddingConfig, model_dir: &Path) -> Result<Self, ModelError> {
        let model_path = model_dir.join("model.onnx");
        if !model_path.exists() {
            return Err(ModelError::NotFound(format!(
                "model not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(load_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load_err)?
            .with_intra_threads(worker_threads())
            .map_err(load_err)?
            .commit_from_file(&model_path)
            .map_err(load_err)?;

        let mut tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json"))
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_tokens as usize,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimension: config.dimension as usize,
        })
    }

    fn embed(&self, texts: &[String], is_query: bool) -> Result<Vec<Vec<f32>>, ModelError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Queries carry an instruction prefix; documents embed as-is.
        let inputs: Vec<String> = if is_query {
            texts
                .iter()
                .map(|t| format!("{QUERY_INSTRUCTION}{t}"))
                .collect()
        } else {
            texts.to_vec()
        };

        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        let sequences: Vec<(&[u32], &[u32])> = encodings
            .iter()
            .map(|e| (e.get_ids(), e.get_attention_mask()))
            .collect();
        let seq_lens: Vec<usize> = sequences.iter().map(|(ids, _)| ids.len()).collect();
        let batch = TokenBatch::new(&sequences);

        let run_err = |e: ort::Error| ModelError::InferenceError(e.to_string());
        let shape = [batch.rows, batch.cols];

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::InferenceError("session lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![
                Tensor::from_array((shape, batch.input_ids)).map_err(run_err)?,
                Tensor::from_array((shape, batch.attention_mask)).map_err(run_err)?,
                Tensor::from_array((shape, batch.position_ids)).map_err(run_err)?
            ])
            .map_err(run_err)?;

        let hidden = outputs[0].try_extract_array::<f32>().map_err(run_err)?;
        pool(&hidden, &seq_lens, self.dimension)
    }
}

/// Row-major i64 tensors for a padded token batch: input ids, attention
/// mask, and per-sequence position ids. Rows shorter than the widest
/// sequence are zero-padded.
struct TokenBatch {
    rows: usize,
    cols: usize,
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    position_ids: Vec<i64>,
}

impl TokenBatch {
    fn new(sequences: &[(&[u32], &[u32])]) -> Self {
        let rows = sequences.len();
        let cols = sequences
            .iter()
            .map(|(ids, _)| ids.len())
            .max()
            .unwrap_or(0);

        let mut input_ids = vec![0i64; rows * cols];
        let mut attention_mask = vec![0i64; rows * cols];
        let mut position_ids = vec![0i64; rows * cols];

        for (row, (ids, mask)) in sequences.iter().enumerate() {
            let offset = row * cols;
            for (col, (&id, &m)) in ids.iter().zip(mask.iter()).enumerate() {
                input_ids[offset + col] = i64::from(id);
                attention_mask[offset + col] = i64::from(m);
                position_ids[offset + col] = col as i64;
            }
        }

        Self {
            rows,
            cols,
            input_ids,
            attention_mask,
            position_ids,
        }
    }
}

/// Reduce model output to one unit vector per input sequence.
///
/// Token-level output (3D) takes the hidden state of each sequence's last
/// real token; pooled output (2D) is used directly.
fn pool(
    hidden: &ArrayViewD<'_, f32>,
    seq_lens: &[usize],
    dimension: usize,
) -> Result<Vec<Vec<f32>>, ModelError> {
    match hidden.shape().len() {
        3 => Ok(seq_lens
            .iter()
            .enumerate()
            .map(|(i, &len)| {
                let last = len.saturating_sub(1);
                let row: Vec<f32> = (0..dimension).map(|d| hidden[[i, last, d]]).collect();
                normalize(&row)
            })
            .collect()),
        2 => Ok((0..seq_lens.len())
            .map(|i| {
                let row: Vec<f32> = (0..dimension).map(|d| hidden[[i, d]]).collect();
                normalize(&row)
            })
            .collect()),
        other => Err(ModelError::InferenceError(format!(
            "unexpected output rank: {other}"
        ))),
    }
}

fn load_err(e: ort::Error) -> ModelError {
    ModelError::LoadError(e.to_string())
}

fn worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
