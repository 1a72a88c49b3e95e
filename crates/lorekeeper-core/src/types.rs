// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the memory engine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a stored memory (SQLite rowid).
pub type MemoryId = i64;

/// Identifier of the entity (character, NPC, location) that owns memories.
pub type EntityId = i64;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Embedding,
}

/// Input for an embedding adapter.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingInput {
    /// Texts to encode, one vector per entry.
    pub texts: Vec<String>,
}

impl EmbeddingInput {
    /// Input holding a single text.
    pub fn single(text: impl Into<String>) -> Self {
        Self {
            texts: vec![text.into()],
        }
    }
}

/// Output from an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// One L2-normalized vector per input text, in input order.
    pub embeddings: Vec<Vec<f32>>,
    /// Dimensionality of every vector in `embeddings`.
    pub dimensions: usize,
}

/// Where a memory came from in the chat transport.
///
/// All fields are optional; a memory added from a tool or import has none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySource {
    /// Originating message id.
    pub message_id: Option<String>,
    /// Channel the originating message was posted in.
    pub channel_id: Option<String>,
    /// Guild (server) the channel belongs to.
    pub guild_id: Option<String>,
}

impl MemorySource {
    /// Source tagged with a channel and its guild.
    pub fn channel(channel_id: impl Into<String>, guild_id: Option<String>) -> Self {
        Self {
            message_id: None,
            channel_id: Some(channel_id.into()),
            guild_id,
        }
    }
}

/// A curated fact or event about an owning entity.
///
/// The memory's embedding lives in a separate table keyed by `id` and is
/// never carried on this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// Store-assigned identifier.
    pub id: MemoryId,
    /// Entity that owns this memory.
    pub entity_id: EntityId,
    /// The memory text.
    pub content: String,
    /// Optional references to where the memory originated.
    pub source: MemorySource,
    /// Frequency + recency score; boosted on retrieval, decayed periodically.
    pub frecency: f64,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-update timestamp.
    pub updated_at: String,
}

/// Breadth of context used to pre-filter candidate memories.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum MemoryScope {
    /// Memory retrieval disabled.
    #[default]
    None,
    /// Only memories sourced from the given channel.
    Channel,
    /// Only memories sourced from the given guild.
    Guild,
    /// Every memory the entity owns.
    Global,
}
