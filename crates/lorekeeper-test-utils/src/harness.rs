// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for memory integration tests.
//!
//! `TestHarness` wires a [`MockEmbedder`] to an in-memory database, an
//! isolated embedding cache, a store, and a retriever.

use std::sync::Arc;
use std::time::Duration;

use lorekeeper_config::model::MemoryConfig;
use lorekeeper_core::error::LorekeeperError;
use lorekeeper_core::traits::EmbeddingAdapter;
use lorekeeper_core::types::{EntityId, Memory, MemorySource};
use lorekeeper_memory::{EmbeddingCache, FrecencyPolicy, MemoryRetriever, MemoryStore};
use lorekeeper_storage::Database;

use crate::mock_embedder::MockEmbedder;

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    embedder: MockEmbedder,
    memory: MemoryConfig,
    batch_size: usize,
    dimensions: Option<usize>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            embedder: MockEmbedder::default(),
            memory: MemoryConfig::default(),
            batch_size: 32,
            dimensions: None,
        }
    }

    /// Use a preconfigured encoder.
    pub fn with_embedder(mut self, embedder: MockEmbedder) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.memory.similarity_threshold = threshold;
        self
    }

    pub fn with_cache(mut self, ttl: Duration, capacity: usize) -> Self {
        self.memory.cache_ttl_secs = ttl.as_secs();
        self.memory.cache_capacity = capacity;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Dimension the store enforces. Defaults to the encoder's own width.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub async fn build(self) -> Result<TestHarness, LorekeeperError> {
        let db = Arc::new(Database::open_in_memory().await?);
        let dimensions = self.dimensions.unwrap_or(self.embedder.dimensions());
        let embedder = Arc::new(self.embedder);
        let store = Arc::new(
            MemoryStore::new(
                Arc::clone(&db),
                Arc::clone(&embedder) as Arc<dyn EmbeddingAdapter>,
                dimensions,
            )
            .with_policy(FrecencyPolicy::from_config(&self.memory))
            .with_batch_size(self.batch_size),
        );
        let cache = Arc::new(EmbeddingCache::from_config(&self.memory));
        let retriever = Arc::new(MemoryRetriever::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            self.memory.similarity_threshold,
        ));

        Ok(TestHarness {
            db,
            embedder,
            cache,
            store,
            retriever,
        })
    }
}

/// A complete in-memory retrieval stack.
pub struct TestHarness {
    pub db: Arc<Database>,
    pub embedder: Arc<MockEmbedder>,
    pub cache: Arc<EmbeddingCache>,
    pub store: Arc<MemoryStore>,
    pub retriever: Arc<MemoryRetriever>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings.
    pub async fn new() -> Result<Self, LorekeeperError> {
        Self::builder().build().await
    }

    /// Add memories with no source references, returning them in order.
    pub async fn seed(
        &self,
        entity_id: EntityId,
        contents: &[&str],
    ) -> Result<Vec<Memory>, LorekeeperError> {
        let mut added = Vec::with_capacity(contents.len());
        for content in contents {
            added.push(
                self.store
                    .add_memory(entity_id, content, MemorySource::default())
                    .await?,
            );
        }
        Ok(added)
    }

    /// Current frecency of a memory, if it still exists.
    pub async fn frecency(&self, id: i64) -> Result<Option<f64>, LorekeeperError> {
        Ok(self.store.get_memory(id).await?.map(|m| m.frecency))
    }
}
