// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Repository contracts for the memory store.
//!
//! These four traits are the narrow boundary to the durable store: keyed
//! upsert, filtered/limited query, and vector similarity search over the
//! embedding column. Single-record operations are atomic; there are no
//! cross-record transactions, and callers tolerate snapshots going stale
//! under concurrent decay/consolidation.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    DecisionId, DecisionRecord, LearningObjective, MemoryId, MemoryRecord, ObjectiveId, Pattern,
};

/// Filter applied to record scans and similarity searches.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub owner: Option<String>,
    pub category: Option<String>,
    pub min_importance: Option<f64>,
}

#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Insert or replace a record by id.
    async fn upsert(&self, record: &MemoryRecord) -> Result<()>;

    async fn get(&self, id: MemoryId) -> Result<Option<MemoryRecord>>;

    async fn delete(&self, id: MemoryId) -> Result<()>;

    /// All records matching the filter, unordered.
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<MemoryRecord>>;

    /// Nearest neighbours of `embedding` under the filter, ranked by cosine
    /// similarity descending. Records with sentinel embeddings never match.
    async fn search_similar(
        &self,
        embedding: &[f32],
        filter: &RecordFilter,
        limit: usize,
    ) -> Result<Vec<(MemoryRecord, f64)>>;

    async fn count(&self) -> Result<u64>;
}

#[async_trait]
pub trait DecisionRepository: Send + Sync {
    async fn upsert(&self, decision: &DecisionRecord) -> Result<()>;

    async fn get(&self, id: DecisionId) -> Result<Option<DecisionRecord>>;

    /// All decisions of a type, newest first.
    async fn list_by_type(&self, decision_type: &str) -> Result<Vec<DecisionRecord>>;

    /// All decisions created at or after `since`, newest first.
    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<DecisionRecord>>;

    async fn count(&self) -> Result<u64>;
}

#[async_trait]
pub trait PatternRepository: Send + Sync {
    /// Insert or replace by pattern name.
    async fn upsert(&self, pattern: &Pattern) -> Result<()>;

    async fn get(&self, name: &str) -> Result<Option<Pattern>>;

    async fn list(&self) -> Result<Vec<Pattern>>;

    async fn count(&self) -> Result<u64>;
}

#[async_trait]
pub trait ObjectiveRepository: Send + Sync {
    async fn upsert(&self, objective: &LearningObjective) -> Result<()>;

    async fn get(&self, id: ObjectiveId) -> Result<Option<LearningObjective>>;

    /// Objectives without a completion timestamp, highest priority first.
    async fn list_open(&self) -> Result<Vec<LearningObjective>>;

    async fn count(&self) -> Result<u64>;
}
