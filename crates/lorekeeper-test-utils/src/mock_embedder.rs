// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic encoder for tests.
//!
//! Each lowercase alphanumeric word is hashed (FNV-1a) into one of
//! `dimensions` buckets and the counts are L2-normalized, so texts sharing
//! words score above zero and texts sharing none score zero (barring bucket
//! collisions). Exact vectors can be pinned per text.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use lorekeeper_core::error::LorekeeperError;
use lorekeeper_core::traits::EmbeddingAdapter;
use lorekeeper_core::traits::adapter::PluginAdapter;
use lorekeeper_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};

/// Bucket count used by [`MockEmbedder::default`].
pub const MOCK_DIM: usize = 64;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// A deterministic [`EmbeddingAdapter`] with call counting and failure injection.
pub struct MockEmbedder {
    dimensions: usize,
    fixed: Mutex<HashMap<String, Vec<f32>>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fixed: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Pin the vector returned for `text`. It is returned as given.
    pub fn with_fixed(self, text: &str, vector: Vec<f32>) -> Self {
        self.set_fixed(text, vector);
        self
    }

    pub fn set_fixed(&self, text: &str, vector: Vec<f32>) {
        self.fixed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(text.to_string(), vector);
    }

    /// Make every following call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of texts encoded so far, including failed attempts.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The vector this encoder produces for `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self
            .fixed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(text)
        {
            return v.clone();
        }

        let mut v = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();
        for word in lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = (fnv1a(word.as_bytes()) % self.dimensions as u64) as usize;
            v[bucket] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(MOCK_DIM)
    }
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, LorekeeperError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LorekeeperError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, LorekeeperError> {
        self.calls.fetch_add(input.texts.len(), Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(LorekeeperError::embedding("mock encoder failure"));
        }
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| self.vector_for(t)).collect(),
            dimensions: self.dimensions,
        })
    }
}
