// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Lorekeeper.

use thiserror::Error;

use crate::types::MemoryId;

/// The primary error type used across adapter traits and memory operations.
#[derive(Debug, Error)]
pub enum LorekeeperError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Text encoder errors (model unavailable, tokenization, inference).
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Two vectors handed to the similarity kernel disagree on length.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// No memory exists with the given id.
    #[error("memory {id} not found")]
    MemoryNotFound { id: MemoryId },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LorekeeperError {
    /// Shorthand for an encoder failure without an underlying source.
    pub fn embedding(message: impl Into<String>) -> Self {
        LorekeeperError::Embedding {
            message: message.into(),
            source: None,
        }
    }
}
