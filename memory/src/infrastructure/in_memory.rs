// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! DashMap-backed repositories.
//!
//! Default backend for tests and single-process deployments. Entry-level
//! locking gives the per-record atomicity the store contract requires.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::{
    cosine_similarity, DecisionId, DecisionRecord, LearningObjective, MemoryId, MemoryRecord,
    ObjectiveId, Pattern,
};

use super::repository::{
    DecisionRepository, ObjectiveRepository, PatternRepository, RecordFilter, RecordRepository,
};

fn matches(record: &MemoryRecord, filter: &RecordFilter) -> bool {
    if let Some(owner) = &filter.owner {
        if &record.owner != owner {
            return false;
        }
    }
    if let Some(category) = &filter.category {
        if &record.category != category {
            return false;
        }
    }
    if let Some(min) = filter.min_importance {
        if record.importance() < min {
            return false;
        }
    }
    true
}

#[derive(Default)]
pub struct InMemoryRecordRepository {
    records: DashMap<MemoryId, MemoryRecord>,
}

impl InMemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn upsert(&self, record: &MemoryRecord) -> Result<()> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, id: MemoryId) -> Result<Option<MemoryRecord>> {
        Ok(self.records.get(&id).map(|r| r.clone()))
    }

    async fn delete(&self, id: MemoryId) -> Result<()> {
        self.records.remove(&id);
        Ok(())
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<MemoryRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| matches(entry.value(), filter))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn search_similar(
        &self,
        embedding: &[f32],
        filter: &RecordFilter,
        limit: usize,
    ) -> Result<Vec<(MemoryRecord, f64)>> {
        let mut scored: Vec<(MemoryRecord, f64)> = self
            .records
            .iter()
            .filter(|entry| matches(entry.value(), filter) && !entry.value().unembedded)
            .map(|entry| {
                let similarity = cosine_similarity(embedding, &entry.value().embedding);
                (entry.value().clone(), similarity)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.len() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryDecisionRepository {
    decisions: DashMap<DecisionId, DecisionRecord>,
}

impl InMemoryDecisionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DecisionRepository for InMemoryDecisionRepository {
    async fn upsert(&self, decision: &DecisionRecord) -> Result<()> {
        self.decisions.insert(decision.id, decision.clone());
        Ok(())
    }

    async fn get(&self, id: DecisionId) -> Result<Option<DecisionRecord>> {
        Ok(self.decisions.get(&id).map(|d| d.clone()))
    }

    async fn list_by_type(&self, decision_type: &str) -> Result<Vec<DecisionRecord>> {
        let mut out: Vec<DecisionRecord> = self
            .decisions
            .iter()
            .filter(|entry| entry.value().decision_type == decision_type)
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<DecisionRecord>> {
        let mut out: Vec<DecisionRecord> = self
            .decisions
            .iter()
            .filter(|entry| entry.value().created_at >= since)
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.decisions.len() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryPatternRepository {
    patterns: DashMap<String, Pattern>,
}

impl InMemoryPatternRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatternRepository for InMemoryPatternRepository {
    async fn upsert(&self, pattern: &Pattern) -> Result<()> {
        self.patterns.insert(pattern.name.clone(), pattern.clone());
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Pattern>> {
        Ok(self.patterns.get(name).map(|p| p.clone()))
    }

    async fn list(&self) -> Result<Vec<Pattern>> {
        Ok(self.patterns.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.patterns.len() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryObjectiveRepository {
    objectives: DashMap<ObjectiveId, LearningObjective>,
}

impl InMemoryObjectiveRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectiveRepository for InMemoryObjectiveRepository {
    async fn upsert(&self, objective: &LearningObjective) -> Result<()> {
        self.objectives.insert(objective.id, objective.clone());
        Ok(())
    }

    async fn get(&self, id: ObjectiveId) -> Result<Option<LearningObjective>> {
        Ok(self.objectives.get(&id).map(|o| o.clone()))
    }

    async fn list_open(&self) -> Result<Vec<LearningObjective>> {
        let mut out: Vec<LearningObjective> = self
            .objectives
            .iter()
            .filter(|entry| entry.value().is_open())
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));
        Ok(out)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.objectives.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(owner: &str, category: &str, embedding: Vec<f32>) -> MemoryRecord {
        MemoryRecord::new(owner, category, json!({}), embedding, 0.5)
    }

    #[tokio::test]
    async fn search_ranks_by_similarity_and_honours_filter() {
        let repo = InMemoryRecordRepository::new();
        repo.upsert(&record("crew", "note", vec![1.0, 0.0])).await.unwrap();
        repo.upsert(&record("crew", "note", vec![0.0, 1.0])).await.unwrap();
        repo.upsert(&record("billing", "note", vec![1.0, 0.0])).await.unwrap();

        let filter = RecordFilter { owner: Some("crew".into()), ..Default::default() };
        let hits = repo.search_similar(&[1.0, 0.0], &filter, 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].1 > hits[1].1);
        assert_eq!(hits[0].0.owner, "crew");
    }

    #[tokio::test]
    async fn sentinel_records_are_excluded_from_similarity() {
        let repo = InMemoryRecordRepository::new();
        let sentinel = record("crew", "note", vec![]).with_sentinel_embedding(2);
        repo.upsert(&sentinel).await.unwrap();

        let hits = repo
            .search_similar(&[1.0, 0.0], &RecordFilter::default(), 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn decisions_list_newest_first() {
        let repo = InMemoryDecisionRepository::new();
        let older = DecisionRecord::new("pricing", json!({}), vec!["A".into()], "A", 0.5);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let newer = DecisionRecord::new("pricing", json!({}), vec!["B".into()], "B", 0.5);
        repo.upsert(&older).await.unwrap();
        repo.upsert(&newer).await.unwrap();

        let listed = repo.list_by_type("pricing").await.unwrap();
        assert_eq!(listed[0].id, newer.id);
    }

    #[tokio::test]
    async fn open_objectives_sorted_by_priority() {
        let repo = InMemoryObjectiveRepository::new();
        repo.upsert(&LearningObjective::new("a", 0.2)).await.unwrap();
        repo.upsert(&LearningObjective::new("b", 0.9)).await.unwrap();
        let open = repo.list_open().await.unwrap();
        assert_eq!(open[0].topic, "b");
    }
}
