// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for memory records and their embeddings.

pub mod embeddings;
pub mod memories;
