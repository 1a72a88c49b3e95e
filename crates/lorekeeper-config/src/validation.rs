// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as numeric ranges for the frecency model and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::LorekeeperConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LorekeeperConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let embedding = &config.embedding;
    if embedding.dimensions == 0 {
        errors.push(ConfigError::validation(
            "embedding.dimensions must be at least 1",
        ));
    }
    if embedding.batch_size == 0 {
        errors.push(ConfigError::validation(
            "embedding.batch_size must be at least 1",
        ));
    }
    if embedding.intra_threads == 0 {
        errors.push(ConfigError::validation(
            "embedding.intra_threads must be at least 1",
        ));
    }

    let memory = &config.memory;
    if !(-1.0..=1.0).contains(&memory.similarity_threshold) {
        errors.push(ConfigError::validation(format!(
            "memory.similarity_threshold must be between -1.0 and 1.0, got {}",
            memory.similarity_threshold
        )));
    }
    if memory.cache_ttl_secs == 0 {
        errors.push(ConfigError::validation(
            "memory.cache_ttl_secs must be at least 1",
        ));
    }
    if memory.cache_capacity == 0 {
        errors.push(ConfigError::validation(
            "memory.cache_capacity must be at least 1",
        ));
    }
    if !(memory.frecency_boost >= 0.0) {
        errors.push(ConfigError::validation(format!(
            "memory.frecency_boost must be non-negative, got {}",
            memory.frecency_boost
        )));
    }
    for (key, value) in [
        ("frecency_retention", memory.frecency_retention),
        ("decay_factor", memory.decay_factor),
    ] {
        if !(value > 0.0 && value <= 1.0) {
            errors.push(ConfigError::validation(format!(
                "memory.{key} must be in (0.0, 1.0], got {value}"
            )));
        }
    }
    if !(memory.cleanup_threshold >= 0.0) {
        errors.push(ConfigError::validation(format!(
            "memory.cleanup_threshold must be non-negative, got {}",
            memory.cleanup_threshold
        )));
    }
    if memory.maintenance_interval_secs == 0 {
        errors.push(ConfigError::validation(
            "memory.maintenance_interval_secs must be at least 1",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = LorekeeperConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = LorekeeperConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn similarity_threshold_out_of_range_fails() {
        let mut config = LorekeeperConfig::default();
        config.memory.similarity_threshold = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "similarity_threshold"));
    }

    #[test]
    fn zero_cache_capacity_fails() {
        let mut config = LorekeeperConfig::default();
        config.memory.cache_capacity = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "cache_capacity"));
    }

    #[test]
    fn retention_above_one_fails() {
        let mut config = LorekeeperConfig::default();
        config.memory.frecency_retention = 1.2;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "frecency_retention"));
    }

    #[test]
    fn nan_boost_fails() {
        let mut config = LorekeeperConfig::default();
        config.memory.frecency_boost = f64::NAN;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "frecency_boost"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = LorekeeperConfig::default();
        config.memory.decay_factor = 0.0;
        config.embedding.batch_size = 0;
        config.memory.cache_ttl_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
