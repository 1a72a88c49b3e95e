// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ONNX sentence encoder for local inference.
//!
//! Runs a BERT-style sentence transformer (all-MiniLM-L6-v2 by default) on
//! CPU and produces L2-normalized vectors via attention-masked mean pooling.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ndarray::Array2;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;
use tracing::debug;

use lorekeeper_config::model::EmbeddingConfig;
use lorekeeper_core::error::LorekeeperError;
use lorekeeper_core::traits::EmbeddingAdapter;
use lorekeeper_core::traits::adapter::PluginAdapter;
use lorekeeper_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};

use crate::similarity::check_dimensions;

/// Output size of all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

fn encoder_err(context: &str, e: impl std::fmt::Display) -> LorekeeperError {
    LorekeeperError::embedding(format!("{context}: {e}"))
}

/// Sentence encoder backed by an ONNX Runtime session.
///
/// Loading is synchronous and slow; wrap it in a
/// [`LazyEmbedder`](crate::provider::LazyEmbedder) rather than calling
/// [`OnnxEmbedder::load`] on a request path.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    dimensions: usize,
}

impl OnnxEmbedder {
    /// Load the model and `tokenizer.json` (from the model's directory).
    pub fn load(config: &EmbeddingConfig) -> Result<Self, LorekeeperError> {
        let model_path = Path::new(&config.model_path);
        let model_dir = model_path.parent().ok_or_else(|| {
            LorekeeperError::embedding(format!("invalid model path: {}", config.model_path))
        })?;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            LorekeeperError::embedding(format!(
                "failed to load tokenizer from {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        let session = Session::builder()
            .map_err(|e| encoder_err("failed to create session builder", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| encoder_err("failed to set optimization level", e))?
            .with_intra_threads(config.intra_threads)
            .map_err(|e| encoder_err("failed to set intra-op threads", e))?
            .commit_from_file(model_path)
            .map_err(|e| encoder_err(&format!("failed to load {}", model_path.display()), e))?;

        debug!(path = %model_path.display(), "onnx session ready");
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimensions: config.dimensions,
        })
    }

    /// Encode one text into a unit vector.
    pub fn encode(&self, text: &str) -> Result<Vec<f32>, LorekeeperError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| LorekeeperError::embedding(format!("tokenization failed: {e}")))?;

        let widen = |xs: &[u32]| xs.iter().map(|&x| x as i64).collect::<Vec<i64>>();
        let input_ids = widen(encoding.get_ids());
        let attention_mask = widen(encoding.get_attention_mask());
        let token_type_ids = widen(encoding.get_type_ids());
        let seq_len = input_ids.len();

        let as_batch = |values: Vec<i64>| {
            Array2::from_shape_vec((1, seq_len), values)
                .map_err(|e| encoder_err("failed to shape input tensor", e))
        };
        let ids = as_batch(input_ids)?;
        let mask = as_batch(attention_mask.clone())?;
        let types = as_batch(token_type_ids)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| LorekeeperError::embedding(format!("onnx session poisoned: {e}")))?;

        let ids = TensorRef::from_array_view(&ids).map_err(|e| encoder_err("input_ids", e))?;
        let mask = TensorRef::from_array_view(&mask).map_err(|e| encoder_err("attention_mask", e))?;
        let types =
            TensorRef::from_array_view(&types).map_err(|e| encoder_err("token_type_ids", e))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => ids,
                "attention_mask" => mask,
                "token_type_ids" => types
            ])
            .map_err(|e| encoder_err("inference failed", e))?;

        // [1, seq_len, hidden]
        let (shape, hidden_states) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| encoder_err("failed to read output tensor", e))?;
        let hidden = shape[shape.len() - 1] as usize;

        pool_sentence(hidden_states, &attention_mask, hidden, self.dimensions)
    }
}

/// Mean-pool and normalize one sequence, refusing a model whose hidden size
/// is not the configured embedding width.
fn pool_sentence(
    hidden_states: &[f32],
    attention_mask: &[i64],
    hidden: usize,
    dimensions: usize,
) -> Result<Vec<f32>, LorekeeperError> {
    check_dimensions(dimensions, hidden)?;
    let mut pooled = mean_pool(hidden_states, attention_mask, hidden);
    l2_normalize(&mut pooled);
    Ok(pooled)
}

/// Average the token vectors whose attention mask is set.
fn mean_pool(hidden_states: &[f32], attention_mask: &[i64], hidden: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden];
    let mut count = 0usize;

    for (token, row) in hidden_states.chunks_exact(hidden).enumerate() {
        if attention_mask.get(token).copied().unwrap_or(0) == 0 {
            continue;
        }
        for (acc, x) in sum.iter_mut().zip(row) {
            *acc += x;
        }
        count += 1;
    }

    if count > 0 {
        let n = count as f32;
        sum.iter_mut().for_each(|v| *v /= n);
    }
    sum
}

/// Scale a vector to unit length in place. Zero vectors are left as-is.
fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

#[async_trait]
impl PluginAdapter for OnnxEmbedder {
    fn name(&self) -> &str {
        "onnx-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, LorekeeperError> {
        Ok(match self.session.lock() {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(format!("session lock poisoned: {e}")),
        })
    }

    async fn shutdown(&self) -> Result<(), LorekeeperError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for OnnxEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, LorekeeperError> {
        // One text at a time; the session is not re-entrant.
        let embeddings = input
            .texts
            .iter()
            .map(|text| self.encode(text))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
        })
    }
}
