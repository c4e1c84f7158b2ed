// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Associative memory store for the Atrium engine.
//!
//! Durable, embedding-indexed, importance-scored knowledge base shared by the
//! orchestration engine and its background cognition cycles. Records decay
//! when stale, are reinforced on use, and near-duplicates are consolidated.
//!
//! # Architecture
//!
//! - **Layer:** Learning & Memory Layer
//! - **Purpose:** Owns MemoryRecord, DecisionRecord, Pattern and
//!   LearningObjective state behind per-record atomic repositories

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
pub use application::*;
pub use infrastructure::*;
