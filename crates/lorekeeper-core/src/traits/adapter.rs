// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity and lifecycle shared by pluggable backends.

use async_trait::async_trait;

use crate::error::LorekeeperError;
use crate::types::{AdapterType, HealthStatus};

/// A swappable backend (text encoder, store) with a name, a version and a
/// health probe. `lorekeeper doctor` reports on these.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Display name, e.g. `"onnx-minilm"`.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    /// Probe the backend without doing real work.
    async fn health_check(&self) -> Result<HealthStatus, LorekeeperError>;

    /// Release held resources (sessions, connections).
    async fn shutdown(&self) -> Result<(), LorekeeperError>;
}
