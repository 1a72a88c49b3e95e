// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Types produced and consumed by the retrieval pipeline.

use lorekeeper_core::types::{Memory, MemoryScope};

/// A memory paired with its best similarity against the supplied queries.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMemory {
    /// The candidate memory.
    pub memory: Memory,
    /// Maximum cosine similarity over all query texts.
    pub similarity: f32,
}

/// A scope plus the ids it filters on.
///
/// `channel` scope needs `channel_id`; `guild` scope needs `guild_id`. A
/// filter missing its required id matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeFilter {
    pub scope: MemoryScope,
    pub channel_id: Option<String>,
    pub guild_id: Option<String>,
}

impl ScopeFilter {
    /// Retrieval disabled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every memory the entity owns.
    pub fn global() -> Self {
        Self {
            scope: MemoryScope::Global,
            ..Self::default()
        }
    }

    /// Memories sourced from one channel.
    pub fn channel(channel_id: impl Into<String>) -> Self {
        Self {
            scope: MemoryScope::Channel,
            channel_id: Some(channel_id.into()),
            guild_id: None,
        }
    }

    /// Memories sourced from one guild.
    pub fn guild(guild_id: impl Into<String>) -> Self {
        Self {
            scope: MemoryScope::Guild,
            channel_id: None,
            guild_id: Some(guild_id.into()),
        }
    }

    /// Build a filter from a scope and whatever ids the caller has.
    pub fn new(scope: MemoryScope, channel_id: Option<String>, guild_id: Option<String>) -> Self {
        Self {
            scope,
            channel_id,
            guild_id,
        }
    }

    /// Whether this filter can match anything at all.
    pub fn is_searchable(&self) -> bool {
        match self.scope {
            MemoryScope::None => false,
            MemoryScope::Channel => self.channel_id.is_some(),
            MemoryScope::Guild => self.guild_id.is_some(),
            MemoryScope::Global => true,
        }
    }
}
