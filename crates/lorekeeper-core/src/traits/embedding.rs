// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::LorekeeperError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EmbeddingInput, EmbeddingOutput};

/// Adapter for turning text into fixed-dimension unit vectors.
///
/// Implementations must return exactly one vector per input text and must
/// fail rather than substitute a placeholder vector.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Generates embeddings for the given input.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, LorekeeperError>;

    /// Embeds one text and returns its vector.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, LorekeeperError> {
        let output = self.embed(EmbeddingInput::single(text)).await?;
        output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| LorekeeperError::embedding("embedding returned no results"))
    }
}
