// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Lorekeeper integration tests.
//!
//! Provides a deterministic encoder and a harness wiring it to an in-memory
//! database, so memory tests run fast and without model files.
//!
//! # Components
//!
//! - [`MockEmbedder`] - bag-of-words encoder with fixed overrides and failure injection
//! - [`TestHarness`] - in-memory store, isolated cache, and retriever

pub mod harness;
pub mod mock_embedder;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_embedder::{MOCK_DIM, MockEmbedder};
