// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical memory types are defined in `lorekeeper-core::types` so they
//! can cross adapter boundaries; this module re-exports them and adds the
//! write-side input type.

pub use lorekeeper_core::types::{EntityId, Memory, MemoryId, MemorySource};

/// A memory about to be inserted. The store assigns id, frecency, and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMemory {
    /// Owning entity.
    pub entity_id: EntityId,
    /// Memory text.
    pub content: String,
    /// Optional origin references.
    pub source: MemorySource,
}

impl NewMemory {
    /// A memory with no origin references.
    pub fn new(entity_id: EntityId, content: impl Into<String>) -> Self {
        Self {
            entity_id,
            content: content.into(),
            source: MemorySource::default(),
        }
    }

    /// Attach origin references.
    pub fn with_source(mut self, source: MemorySource) -> Self {
        self.source = source;
        self
    }
}
