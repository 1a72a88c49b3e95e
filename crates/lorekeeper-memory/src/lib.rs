// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic memory retrieval for Lorekeeper.
//!
//! Turns free-text memories about an entity into ranked context for a
//! conversation.
//!
//! ## Architecture
//!
//! - **OnnxEmbedder**: local sentence encoder (384-dim, L2-normalized)
//! - **LazyEmbedder**: loads the encoder on first use, once, shared by all callers
//! - **EmbeddingCache**: TTL + capacity bounded query embedding cache
//! - **similarity**: cosine and batched max-similarity kernels
//! - **MemoryStore**: memory CRUD with paired embeddings, scoped listing, frecency writes
//! - **FrecencyPolicy**: boost/decay/cleanup parameters
//! - **MemoryRetriever**: multi-query search and frecency-boosting retrieval
//! - **MemoryContextProvider**: renders retrieved memories as a `<memories>` block
//! - **FrecencyMaintenance**: periodic decay + cleanup

pub mod cache;
pub mod context;
pub mod embedder;
pub mod frecency;
pub mod maintenance;
pub mod provider;
pub mod retriever;
pub mod similarity;
pub mod store;
pub mod types;

pub use cache::{CacheStats, EmbeddingCache};
pub use context::{MemoryContextProvider, format_memories_for_context};
pub use embedder::OnnxEmbedder;
pub use frecency::FrecencyPolicy;
pub use maintenance::{FrecencyMaintenance, MaintenanceReport};
pub use provider::LazyEmbedder;
pub use retriever::MemoryRetriever;
pub use similarity::{cosine_similarity, max_similarity_matrix};
pub use store::MemoryStore;
pub use types::{ScopeFilter, ScoredMemory};
