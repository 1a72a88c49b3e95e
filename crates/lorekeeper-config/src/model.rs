// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Lorekeeper.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Lorekeeper configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LorekeeperConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Text encoder settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Memory retrieval, cache, and frecency settings.
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("lorekeeper").join("lorekeeper.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("lorekeeper.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Sentence encoder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Path to the ONNX model file. `tokenizer.json` must sit next to it.
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Output dimensionality of the encoder.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Maximum number of texts embedded concurrently in one chunk.
    ///
    /// This bounds memory use; the encoder still runs one text at a time.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// ONNX Runtime intra-op thread count.
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            intra_threads: default_intra_threads(),
        }
    }
}

fn default_model_path() -> String {
    dirs::data_dir()
        .map(|p| {
            p.join("lorekeeper")
                .join("models")
                .join("all-MiniLM-L6-v2")
                .join("model.onnx")
        })
        .unwrap_or_else(|| std::path::PathBuf::from("model.onnx"))
        .to_string_lossy()
        .into_owned()
}

fn default_dimensions() -> usize {
    384
}

fn default_batch_size() -> usize {
    32
}

fn default_intra_threads() -> usize {
    1
}

/// Memory retrieval configuration.
///
/// Controls the similarity floor, the embedding cache, and the frecency model.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Minimum cosine similarity for a memory to be returned (-1.0 to 1.0).
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Seconds an embedding stays in the query cache after insertion.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached query embeddings.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Amount added to a memory's frecency each time it is retrieved.
    #[serde(default = "default_frecency_boost")]
    pub frecency_boost: f64,

    /// Fraction of the previous frecency kept when boosting.
    #[serde(default = "default_frecency_retention")]
    pub frecency_retention: f64,

    /// Multiplier applied to every memory's frecency on each decay pass.
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,

    /// Memories with frecency below this value are deleted by cleanup.
    #[serde(default = "default_cleanup_threshold")]
    pub cleanup_threshold: f64,

    /// Seconds between decay + cleanup passes of the maintenance loop.
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            frecency_boost: default_frecency_boost(),
            frecency_retention: default_frecency_retention(),
            decay_factor: default_decay_factor(),
            cleanup_threshold: default_cleanup_threshold(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
        }
    }
}

fn default_similarity_threshold() -> f64 {
    0.2
}

fn default_cache_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_cache_capacity() -> usize {
    500
}

fn default_frecency_boost() -> f64 {
    0.1
}

fn default_frecency_retention() -> f64 {
    0.95
}

fn default_decay_factor() -> f64 {
    0.99
}

fn default_cleanup_threshold() -> f64 {
    0.01
}

fn default_maintenance_interval_secs() -> u64 {
    3600
}
