// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frecency: a frequency + recency score per memory.
//!
//! Retrieval boosts a memory with `f * retention + boost`, which compounds
//! toward `boost / (1 - retention)` (2.0 with defaults). A periodic decay pass
//! multiplies every score by `decay_factor`, and cleanup deletes memories that
//! fall below `cleanup_threshold`.
//!
//! All of this runs as single SQL statements in
//! `lorekeeper_storage::queries::memories`; the policy only carries the
//! parameters.

use lorekeeper_config::model::MemoryConfig;

/// Tunables of the frecency model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrecencyPolicy {
    pub boost: f64,
    pub retention: f64,
    pub decay_factor: f64,
    pub cleanup_threshold: f64,
}

impl Default for FrecencyPolicy {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default())
    }
}

impl FrecencyPolicy {
    pub fn from_config(config: &MemoryConfig) -> Self {
        Self {
            boost: config.frecency_boost,
            retention: config.frecency_retention,
            decay_factor: config.decay_factor,
            cleanup_threshold: config.cleanup_threshold,
        }
    }
}
