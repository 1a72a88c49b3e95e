// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Lorekeeper.
//!
//! Foundational error type, adapter traits, and identifiers shared by the
//! storage, memory, and CLI crates. Text encoders plug in through
//! [`EmbeddingAdapter`].

pub mod error;
pub mod traits;
pub mod types;

pub use error::LorekeeperError;
pub use types::{
    AdapterType, EmbeddingInput, EmbeddingOutput, EntityId, HealthStatus, Memory, MemoryId,
    MemoryScope, MemorySource,
};

pub use traits::{EmbeddingAdapter, PluginAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lorekeeper_error_has_all_variants() {
        let _config = LorekeeperError::Config("test".into());
        let _storage = LorekeeperError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _embedding = LorekeeperError::Embedding {
            message: "test".into(),
            source: None,
        };
        let _dims = LorekeeperError::DimensionMismatch {
            expected: 384,
            actual: 3,
        };
        let _missing = LorekeeperError::MemoryNotFound { id: 7 };
        let _internal = LorekeeperError::Internal("test".into());
    }

    #[test]
    fn adapter_type_display_round_trip() {
        use std::str::FromStr;

        for variant in [AdapterType::Storage, AdapterType::Embedding] {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn adapter_type_serialization() {
        let json = serde_json::to_string(&AdapterType::Embedding).expect("should serialize");
        let parsed: AdapterType = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(parsed, AdapterType::Embedding);
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        let degraded = HealthStatus::Degraded("model not loaded".into());
        let unhealthy = HealthStatus::Unhealthy("down".into());

        assert_eq!(healthy, HealthStatus::Healthy);
        assert_ne!(degraded, healthy);
        assert_ne!(unhealthy, healthy);
    }

    #[test]
    fn adapter_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_embedding_adapter<T: EmbeddingAdapter>() {}
    }
}
