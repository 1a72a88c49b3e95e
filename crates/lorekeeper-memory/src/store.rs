// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory records and their embeddings, kept 1:1.
//!
//! Content is always embedded before anything is written, and the record and
//! vector land in the same transaction. An encoder failure therefore leaves
//! the store untouched and is returned to the caller. Vectors whose length
//! differs from the store's configured dimension are rejected the same way.

use std::sync::Arc;

use tracing::{debug, info};

use lorekeeper_core::error::LorekeeperError;
use lorekeeper_core::traits::EmbeddingAdapter;
use lorekeeper_core::types::{EntityId, Memory, MemoryId, MemoryScope, MemorySource};
use lorekeeper_storage::Database;
use lorekeeper_storage::models::NewMemory;
use lorekeeper_storage::queries::{embeddings, memories};

use crate::frecency::FrecencyPolicy;
use crate::provider::embed_in_chunks;
use crate::similarity::check_dimensions;
use crate::types::ScopeFilter;

/// Durable memory store backed by SQLite.
pub struct MemoryStore {
    db: Arc<Database>,
    embedder: Arc<dyn EmbeddingAdapter>,
    dimensions: usize,
    policy: FrecencyPolicy,
    batch_size: usize,
}

impl MemoryStore {
    /// Creates a store whose embeddings must all have `dimensions` entries,
    /// with the default frecency policy and batch size.
    pub fn new(db: Arc<Database>, embedder: Arc<dyn EmbeddingAdapter>, dimensions: usize) -> Self {
        Self {
            db,
            embedder,
            dimensions,
            policy: FrecencyPolicy::default(),
            batch_size: 32,
        }
    }

    pub fn with_policy(mut self, policy: FrecencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Maximum texts embedded concurrently by [`MemoryStore::set_memories`].
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingAdapter> {
        &self.embedder
    }

    /// Length every stored and query embedding must have.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn policy(&self) -> &FrecencyPolicy {
        &self.policy
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed(&self, content: &str) -> Result<Vec<f32>, LorekeeperError> {
        let vector = self.embedder.embed_one(content).await?;
        check_dimensions(self.dimensions, vector.len())?;
        Ok(vector)
    }

    /// Embed and persist a new memory.
    pub async fn add_memory(
        &self,
        entity_id: EntityId,
        content: &str,
        source: MemorySource,
    ) -> Result<Memory, LorekeeperError> {
        let embedding = self.embed(content).await?;
        let memory = memories::insert_memory(
            &self.db,
            NewMemory::new(entity_id, content).with_source(source),
            embedding,
        )
        .await?;
        debug!(id = memory.id, entity_id, "memory added");
        metrics::counter!("lorekeeper_memory_writes_total", "op" => "add").increment(1);
        Ok(memory)
    }

    pub async fn get_memory(&self, id: MemoryId) -> Result<Option<Memory>, LorekeeperError> {
        memories::get_memory(&self.db, id).await
    }

    /// All of an entity's memories, most frecent first.
    pub async fn get_memories_for_entity(
        &self,
        entity_id: EntityId,
    ) -> Result<Vec<Memory>, LorekeeperError> {
        memories::list_for_entity(&self.db, entity_id).await
    }

    /// Replace a memory's content and re-embed it.
    ///
    /// Fails with [`LorekeeperError::MemoryNotFound`] if the id is unknown.
    pub async fn update_memory(
        &self,
        id: MemoryId,
        content: &str,
    ) -> Result<Memory, LorekeeperError> {
        if memories::get_memory(&self.db, id).await?.is_none() {
            return Err(LorekeeperError::MemoryNotFound { id });
        }
        let embedding = self.embed(content).await?;
        let updated = memories::update_content(&self.db, id, content.to_string(), embedding)
            .await?
            .ok_or(LorekeeperError::MemoryNotFound { id })?;
        debug!(id, "memory updated");
        metrics::counter!("lorekeeper_memory_writes_total", "op" => "update").increment(1);
        Ok(updated)
    }

    /// Update the entity's memory whose content equals `old_content`.
    ///
    /// Returns `None` if no memory matches.
    pub async fn update_memory_by_content(
        &self,
        entity_id: EntityId,
        old_content: &str,
        new_content: &str,
    ) -> Result<Option<Memory>, LorekeeperError> {
        match memories::find_by_content(&self.db, entity_id, old_content).await? {
            Some(existing) => self.update_memory(existing.id, new_content).await.map(Some),
            None => Ok(None),
        }
    }

    /// Delete a memory and its embedding. Returns whether it existed.
    pub async fn remove_memory(&self, id: MemoryId) -> Result<bool, LorekeeperError> {
        let removed = memories::delete_memory(&self.db, id).await?;
        if removed {
            debug!(id, "memory removed");
            metrics::counter!("lorekeeper_memory_writes_total", "op" => "remove").increment(1);
        }
        Ok(removed)
    }

    /// Delete the entity's memory whose content equals `content`.
    pub async fn remove_memory_by_content(
        &self,
        entity_id: EntityId,
        content: &str,
    ) -> Result<bool, LorekeeperError> {
        match memories::find_by_content(&self.db, entity_id, content).await? {
            Some(existing) => self.remove_memory(existing.id).await,
            None => Ok(false),
        }
    }

    /// Replace all of an entity's memories with `contents`.
    ///
    /// Every text is embedded first; if any embedding fails the existing set
    /// is left as it was.
    pub async fn set_memories(
        &self,
        entity_id: EntityId,
        contents: &[String],
    ) -> Result<Vec<Memory>, LorekeeperError> {
        let vectors = embed_in_chunks(self.embedder.as_ref(), contents, self.batch_size).await?;
        for vector in &vectors {
            check_dimensions(self.dimensions, vector.len())?;
        }
        let rows = contents
            .iter()
            .zip(vectors)
            .map(|(content, vector)| (NewMemory::new(entity_id, content.as_str()), vector))
            .collect();
        let replaced = memories::replace_for_entity(&self.db, entity_id, rows).await?;
        info!(entity_id, count = replaced.len(), "memories replaced");
        Ok(replaced)
    }

    /// Memories visible under a scope, most frecent first.
    ///
    /// `none`, or `channel`/`guild` without the matching id, yields nothing.
    pub async fn list_scoped(
        &self,
        entity_id: EntityId,
        filter: &ScopeFilter,
    ) -> Result<Vec<Memory>, LorekeeperError> {
        match (filter.scope, &filter.channel_id, &filter.guild_id) {
            (MemoryScope::Global, _, _) => memories::list_for_entity(&self.db, entity_id).await,
            (MemoryScope::Channel, Some(channel), _) => {
                memories::list_for_channel(&self.db, entity_id, channel).await
            }
            (MemoryScope::Guild, _, Some(guild)) => {
                memories::list_for_guild(&self.db, entity_id, guild).await
            }
            _ => Ok(Vec::new()),
        }
    }

    pub async fn count_for_entity(&self, entity_id: EntityId) -> Result<usize, LorekeeperError> {
        memories::count_for_entity(&self.db, entity_id).await
    }

    /// Delete every memory the entity owns.
    pub async fn remove_all_for_entity(
        &self,
        entity_id: EntityId,
    ) -> Result<usize, LorekeeperError> {
        let removed = memories::delete_for_entity(&self.db, entity_id).await?;
        info!(entity_id, removed, "entity memories cleared");
        Ok(removed)
    }

    /// Stored embeddings for `ids`, skipping memories that have none.
    pub async fn embeddings_for(
        &self,
        ids: &[MemoryId],
    ) -> Result<Vec<(MemoryId, Vec<f32>)>, LorekeeperError> {
        embeddings::get_embeddings(&self.db, ids).await
    }

    /// Apply one retrieval boost to a memory. Returns whether it exists.
    pub async fn boost_frecency(&self, id: MemoryId) -> Result<bool, LorekeeperError> {
        memories::boost_frecency(&self.db, id, self.policy.retention, self.policy.boost).await
    }

    /// Apply one retrieval boost to each of `ids` atomically.
    ///
    /// Returns how many of them exist; on error none is boosted.
    pub async fn boost_frecency_many(&self, ids: &[MemoryId]) -> Result<usize, LorekeeperError> {
        memories::boost_frecency_many(
            &self.db,
            ids.to_vec(),
            self.policy.retention,
            self.policy.boost,
        )
        .await
    }

    /// Decay every memory's frecency once.
    pub async fn decay_all_frecency(&self) -> Result<usize, LorekeeperError> {
        let decayed = memories::decay_all(&self.db, self.policy.decay_factor).await?;
        debug!(decayed, factor = self.policy.decay_factor, "frecency decayed");
        Ok(decayed)
    }

    /// Delete memories whose frecency fell below the cleanup threshold.
    pub async fn cleanup_low_frecency(&self) -> Result<usize, LorekeeperError> {
        let removed =
            memories::delete_below_frecency(&self.db, self.policy.cleanup_threshold).await?;
        if removed > 0 {
            info!(
                removed,
                threshold = self.policy.cleanup_threshold,
                "low-frecency memories removed"
            );
            metrics::counter!("lorekeeper_memory_cleanup_removed_total").increment(removed as u64);
        }
        Ok(removed)
    }
}
