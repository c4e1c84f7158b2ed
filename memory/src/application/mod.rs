// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0

pub mod store;

pub use store::{
    DecayReport, MemoryConfig, MemoryError, MemoryQuery, MemoryStats, MemoryStore,
    StandardMemoryStore,
};
