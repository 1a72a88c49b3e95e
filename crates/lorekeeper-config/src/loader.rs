// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./lorekeeper.toml` > `~/.config/lorekeeper/lorekeeper.toml`
//! > `/etc/lorekeeper/lorekeeper.toml` with environment variable overrides via the
//! `LOREKEEPER_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::LorekeeperConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/lorekeeper/lorekeeper.toml";

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "lorekeeper.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/lorekeeper/lorekeeper.toml` (system-wide)
/// 3. `~/.config/lorekeeper/lorekeeper.toml` (user XDG config)
/// 4. `./lorekeeper.toml` (local directory)
/// 5. `LOREKEEPER_*` environment variables
pub fn load_config() -> Result<LorekeeperConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<LorekeeperConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LorekeeperConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LorekeeperConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LorekeeperConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LorekeeperConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Location of the per-user configuration file, if a config dir exists.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("lorekeeper").join(LOCAL_CONFIG_FILE))
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `LOREKEEPER_MEMORY_CACHE_TTL_SECS` must map to
/// `memory.cache_ttl_secs`, not `memory.cache.ttl.secs`.
fn env_provider() -> Env {
    Env::prefixed("LOREKEEPER_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("logging_", "logging.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("embedding_", "embedding.", 1)
            .replacen("memory_", "memory.", 1);
        mapped.into()
    })
}
