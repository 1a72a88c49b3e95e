// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering retrieved memories into generation context.

use std::sync::Arc;

use lorekeeper_core::error::LorekeeperError;
use lorekeeper_core::types::{EntityId, Memory};

use crate::retriever::MemoryRetriever;
use crate::types::ScopeFilter;

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render memories as a `<memories entity="NAME" id="ID">` block.
///
/// One memory per line; line breaks inside a memory are flattened to spaces
/// so each line stays one memory. An empty list renders as an empty string.
pub fn format_memories_for_context(
    entity_name: &str,
    entity_id: EntityId,
    memories: &[Memory],
) -> String {
    if memories.is_empty() {
        return String::new();
    }

    let mut block = format!(
        "<memories entity=\"{}\" id=\"{entity_id}\">\n",
        escape_attr(entity_name)
    );
    for memory in memories {
        let line = memory.content.replace(['\r', '\n'], " ");
        block.push_str(line.trim());
        block.push('\n');
    }
    block.push_str("</memories>");
    block
}

/// Supplies an entity's relevant memories as a ready-to-inject context block.
pub struct MemoryContextProvider {
    retriever: Arc<MemoryRetriever>,
}

impl MemoryContextProvider {
    pub fn new(retriever: Arc<MemoryRetriever>) -> Self {
        Self { retriever }
    }

    /// Retrieve (and boost) memories relevant to `messages`.
    ///
    /// Returns `None` when nothing clears the similarity threshold.
    pub async fn provide_context(
        &self,
        entity_id: EntityId,
        entity_name: &str,
        messages: &[String],
        filter: &ScopeFilter,
    ) -> Result<Option<String>, LorekeeperError> {
        let memories = self
            .retriever
            .retrieve_relevant_memories(entity_id, messages, filter)
            .await?;
        if memories.is_empty() {
            return Ok(None);
        }
        Ok(Some(format_memories_for_context(
            entity_name,
            entity_id,
            &memories,
        )))
    }
}
