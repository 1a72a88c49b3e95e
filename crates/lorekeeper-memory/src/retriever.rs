// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-query similarity retrieval.
//!
//! Pipeline: scope filter, embed queries (cache first), load candidate
//! embeddings, max-similarity over all query/candidate pairs, threshold,
//! rank. A single query is the one-row case of the same path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use lorekeeper_core::error::LorekeeperError;
use lorekeeper_core::types::{EntityId, Memory, MemoryId};

use crate::cache::EmbeddingCache;
use crate::provider::embed_in_chunks;
use crate::similarity::{check_dimensions, max_similarity_matrix};
use crate::store::MemoryStore;
use crate::types::{ScopeFilter, ScoredMemory};

/// Ranks an entity's memories against one or more query texts.
pub struct MemoryRetriever {
    store: Arc<MemoryStore>,
    cache: Arc<EmbeddingCache>,
    similarity_threshold: f32,
}

impl MemoryRetriever {
    pub fn new(
        store: Arc<MemoryStore>,
        cache: Arc<EmbeddingCache>,
        similarity_threshold: f64,
    ) -> Self {
        Self {
            store,
            cache,
            similarity_threshold: similarity_threshold as f32,
        }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    pub fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    /// Embed each query, using the cache where possible.
    ///
    /// Misses are embedded in chunks and written back to the cache. Encoder
    /// errors propagate; nothing is substituted for a failed query. A vector
    /// of the wrong length is a [`LorekeeperError::DimensionMismatch`] and is
    /// not cached.
    pub async fn embed_queries(
        &self,
        queries: &[String],
    ) -> Result<Vec<Vec<f32>>, LorekeeperError> {
        let mut vectors: Vec<Option<Vec<f32>>> =
            queries.iter().map(|q| self.cache.get(q)).collect();

        let missing: Vec<usize> = (0..queries.len()).filter(|&i| vectors[i].is_none()).collect();
        if !missing.is_empty() {
            let texts: Vec<String> = missing.iter().map(|&i| queries[i].clone()).collect();
            let embedded = embed_in_chunks(
                self.store.embedder().as_ref(),
                &texts,
                self.store.batch_size(),
            )
            .await?;
            for vector in &embedded {
                check_dimensions(self.store.dimensions(), vector.len())?;
            }
            for (i, vector) in missing.into_iter().zip(embedded) {
                self.cache.put(&queries[i], vector.clone());
                vectors[i] = Some(vector);
            }
        }

        vectors
            .into_iter()
            .map(|v| v.ok_or_else(|| LorekeeperError::embedding("missing query embedding")))
            .collect()
    }

    /// Score in-scope memories against the queries. Does not touch frecency.
    ///
    /// Results at or above the similarity threshold are returned best first.
    /// Memories without a usable embedding are skipped.
    pub async fn search_memories_by_similarity(
        &self,
        entity_id: EntityId,
        queries: &[String],
        filter: &ScopeFilter,
    ) -> Result<Vec<ScoredMemory>, LorekeeperError> {
        if !filter.is_searchable() || queries.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.store.list_scoped(entity_id, filter).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let query_vectors = self.embed_queries(queries).await?;
        let dim = self.store.dimensions();

        let ids: Vec<MemoryId> = candidates.iter().map(|m| m.id).collect();
        let mut stored: HashMap<MemoryId, Vec<f32>> = self
            .store
            .embeddings_for(&ids)
            .await?
            .into_iter()
            .collect();

        let mut scored_candidates = Vec::with_capacity(stored.len());
        let mut targets = Vec::with_capacity(stored.len());
        for memory in candidates {
            match stored.remove(&memory.id) {
                Some(vector) if vector.len() == dim => {
                    targets.push(vector);
                    scored_candidates.push(memory);
                }
                Some(vector) => warn!(
                    id = memory.id,
                    stored = vector.len(),
                    expected = dim,
                    "skipping memory embedded at a different dimension"
                ),
                None => debug!(id = memory.id, "skipping memory without embedding"),
            }
        }

        let scores = max_similarity_matrix(&query_vectors, &targets)?;

        let mut results: Vec<ScoredMemory> = scored_candidates
            .into_iter()
            .zip(scores)
            .filter(|(_, similarity)| *similarity >= self.similarity_threshold)
            .map(|(memory, similarity)| ScoredMemory { memory, similarity })
            .collect();
        // Stable: equal scores keep the candidate (frecency) order.
        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        debug!(
            entity_id,
            queries = queries.len(),
            candidates = targets.len(),
            matched = results.len(),
            "similarity search complete"
        );
        Ok(results)
    }

    /// Search, then boost the frecency of every returned memory.
    ///
    /// The boosts commit together or not at all. Memories are returned as
    /// they were read, before the boost.
    pub async fn retrieve_relevant_memories(
        &self,
        entity_id: EntityId,
        messages: &[String],
        filter: &ScopeFilter,
    ) -> Result<Vec<Memory>, LorekeeperError> {
        let started = Instant::now();
        let results = self
            .search_memories_by_similarity(entity_id, messages, filter)
            .await?;

        let ids: Vec<MemoryId> = results.iter().map(|scored| scored.memory.id).collect();
        let boosted = self.store.boost_frecency_many(&ids).await?;

        metrics::counter!("lorekeeper_memory_retrievals_total").increment(1);
        metrics::counter!("lorekeeper_memory_frecency_boosts_total").increment(boosted as u64);
        metrics::histogram!("lorekeeper_memory_retrieval_seconds")
            .record(started.elapsed().as_secs_f64());

        Ok(results.into_iter().map(|scored| scored.memory).collect())
    }
}
