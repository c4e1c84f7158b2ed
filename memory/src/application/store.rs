// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # MemoryStore — the associative memory service
//!
//! Single synchronization point for foreground decision logic and the
//! background cognition cycles. Per-record operations are atomic; there are
//! no cross-record transactions, so a caller's retrieval snapshot may go
//! stale under concurrent decay or consolidation — by contract it tolerates
//! that.
//!
//! ## Retrieval
//!
//! Queries rank by embedding cosine similarity when query text is given and
//! embeddable, falling back to importance-descending otherwise. Every
//! returned record has its `access_count` bumped and `last_accessed`
//! refreshed, which also restarts its decay clock.
//!
//! ## Maintenance
//!
//! `decay_pass` and `consolidate_pass` are invoked by the cognition
//! scheduler; both are idempotent so an overlapping or repeated cycle never
//! compounds its own effect.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{debug, warn};

use crate::domain::{
    DecisionId, DecisionRecord, LearningObjective, MemoryEvent, MemoryId, MemoryRecord,
    ObjectiveId, Pattern, DecayDisposition, EventSink, NullEventSink,
};
use crate::infrastructure::{
    DecisionRepository, EmbeddingProvider, ObjectiveRepository, PatternRepository,
    RecordRepository,
};
use crate::infrastructure::repository::RecordFilter;

/// Typed failures surfaced to synchronous callers.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Durable store failure; retryable.
    #[error("durable store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("memory record {0} not found")]
    RecordNotFound(MemoryId),

    #[error("decision {0} not found")]
    DecisionNotFound(DecisionId),

    #[error("learning objective not found")]
    ObjectiveNotFound(ObjectiveId),

    #[error(transparent)]
    OutcomeAlreadyReported(#[from] crate::domain::OutcomeError),
}

impl MemoryError {
    fn store(err: anyhow::Error) -> Self {
        MemoryError::StoreUnavailable(format!("{:#}", err))
    }

    /// Whether a caller may usefully retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MemoryError::StoreUnavailable(_))
    }
}

/// Tunable thresholds and weights. The defaults are operating points, not
/// contracts; deployments override them through configuration.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Days without access before a record is considered stale.
    pub staleness_horizon_days: i64,

    /// Records at or above this importance are exempt from decay.
    pub decay_ceiling: f64,

    /// Importance multiplier applied per staleness period.
    pub decay_constant: f64,

    /// Records decaying below this importance are deleted permanently.
    pub prune_threshold: f64,

    /// Embedding similarity above which two records of the same owner and
    /// category are considered duplicates.
    pub consolidation_threshold: f64,

    /// Importance assigned when the caller provides no hint.
    pub default_importance: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            staleness_horizon_days: 7,
            decay_ceiling: 0.95,
            decay_constant: 0.85,
            prune_threshold: 0.1,
            consolidation_threshold: 0.95,
            default_importance: 0.5,
        }
    }
}

/// Retrieval request.
#[derive(Debug, Clone, Default)]
pub struct MemoryQuery {
    pub text: Option<String>,
    pub owner: Option<String>,
    pub category: Option<String>,
    pub min_importance: Option<f64>,
    pub limit: usize,
}

impl MemoryQuery {
    pub fn text(text: impl Into<String>, limit: usize) -> Self {
        Self { text: Some(text.into()), limit, ..Default::default() }
    }

    fn filter(&self) -> RecordFilter {
        RecordFilter {
            owner: self.owner.clone(),
            category: self.category.clone(),
            min_importance: self.min_importance,
        }
    }
}

/// Aggregate counters reported to the observation cycle.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MemoryStats {
    pub records: u64,
    pub decisions: u64,
    pub patterns: u64,
    pub open_objectives: u64,
}

/// Result of one decay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecayReport {
    pub examined: usize,
    pub decayed: usize,
    pub pruned: usize,
}

/// The associative memory store contract.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Store a new record. Embedding failures downgrade to a sentinel
    /// embedding rather than failing the insert.
    async fn insert(
        &self,
        owner: &str,
        category: &str,
        content: serde_json::Value,
        importance_hint: Option<f64>,
    ) -> Result<MemoryId, MemoryError>;

    /// Ranked retrieval with the access-bump side effect.
    async fn query(&self, query: &MemoryQuery) -> Result<Vec<MemoryRecord>, MemoryError>;

    async fn get(&self, id: MemoryId) -> Result<Option<MemoryRecord>, MemoryError>;

    /// `importance = min(1.0, importance + delta)`; returns the new value.
    async fn reinforce(&self, id: MemoryId, delta: f64) -> Result<f64, MemoryError>;

    /// Decay stale low-importance records; prune those falling below the
    /// floor. Idempotent between accesses.
    async fn decay_pass(&self) -> Result<DecayReport, MemoryError>;

    /// Merge near-duplicate records per owner and category. Idempotent.
    async fn consolidate_pass(&self) -> Result<usize, MemoryError>;

    async fn record_decision(&self, decision: &DecisionRecord) -> Result<(), MemoryError>;

    async fn decision(&self, id: DecisionId) -> Result<Option<DecisionRecord>, MemoryError>;

    /// Record a decision outcome exactly once; a second report is rejected
    /// and the first outcome preserved.
    async fn resolve_decision(
        &self,
        id: DecisionId,
        outcome: &str,
        success: bool,
    ) -> Result<DecisionRecord, MemoryError>;

    async fn decisions_for_type(
        &self,
        decision_type: &str,
    ) -> Result<Vec<DecisionRecord>, MemoryError>;

    async fn decisions_since(
        &self,
        since: chrono::DateTime<Utc>,
    ) -> Result<Vec<DecisionRecord>, MemoryError>;

    /// Insert or fold into the named pattern. Mining-cycle only by
    /// convention; nothing on the decision path calls this.
    async fn upsert_pattern(&self, pattern: &Pattern) -> Result<(), MemoryError>;

    async fn pattern(&self, name: &str) -> Result<Option<Pattern>, MemoryError>;

    async fn patterns(&self) -> Result<Vec<Pattern>, MemoryError>;

    async fn add_objective(&self, topic: &str, priority: f64) -> Result<ObjectiveId, MemoryError>;

    async fn open_objectives(&self) -> Result<Vec<LearningObjective>, MemoryError>;

    /// Advance an objective's progress monotonically.
    async fn advance_objective(
        &self,
        id: ObjectiveId,
        progress: f64,
        knowledge: &str,
    ) -> Result<LearningObjective, MemoryError>;

    async fn stats(&self) -> Result<MemoryStats, MemoryError>;
}

/// Standard implementation over the four repositories and an embedding
/// provider.
pub struct StandardMemoryStore {
    records: Arc<dyn RecordRepository>,
    decisions: Arc<dyn DecisionRepository>,
    patterns: Arc<dyn PatternRepository>,
    objectives: Arc<dyn ObjectiveRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    events: Arc<dyn EventSink>,
    config: MemoryConfig,
}

impl StandardMemoryStore {
    pub fn new(
        records: Arc<dyn RecordRepository>,
        decisions: Arc<dyn DecisionRepository>,
        patterns: Arc<dyn PatternRepository>,
        objectives: Arc<dyn ObjectiveRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            records,
            decisions,
            patterns,
            objectives,
            embedder,
            events: Arc::new(NullEventSink),
            config,
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Text fed to the embedding provider for a content payload.
    fn embedding_text(content: &serde_json::Value) -> String {
        match content {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl MemoryStore for StandardMemoryStore {
    async fn insert(
        &self,
        owner: &str,
        category: &str,
        content: serde_json::Value,
        importance_hint: Option<f64>,
    ) -> Result<MemoryId, MemoryError> {
        let importance = importance_hint.unwrap_or(self.config.default_importance);
        let text = Self::embedding_text(&content);

        let record = match self.embedder.embed(&text).await {
            Ok(embedding) => MemoryRecord::new(owner, category, content, embedding, importance),
            Err(e) => {
                warn!(owner, category, error = %e, "embedding failed, storing sentinel");
                MemoryRecord::new(owner, category, content, Vec::new(), importance)
                    .with_sentinel_embedding(self.embedder.dimension())
            }
        };

        self.records.upsert(&record).await.map_err(MemoryError::store)?;

        self.events
            .publish(MemoryEvent::RecordStored {
                id: record.id,
                owner: record.owner.clone(),
                category: record.category.clone(),
                unembedded: record.unembedded,
                at: Utc::now(),
            })
            .await;

        Ok(record.id)
    }

    async fn query(&self, query: &MemoryQuery) -> Result<Vec<MemoryRecord>, MemoryError> {
        let limit = if query.limit == 0 { 10 } else { query.limit };
        let filter = query.filter();

        let embedding = match &query.text {
            Some(text) => match self.embedder.embed(text).await {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(error = %e, "query embedding failed, falling back to importance order");
                    None
                }
            },
            None => None,
        };

        let mut hits: Vec<MemoryRecord> = match embedding {
            Some(embedding) => self
                .records
                .search_similar(&embedding, &filter, limit)
                .await
                .map_err(MemoryError::store)?
                .into_iter()
                .map(|(record, _)| record)
                .collect(),
            None => {
                let mut all = self.records.list(&filter).await.map_err(MemoryError::store)?;
                all.sort_by(|a, b| {
                    b.importance()
                        .partial_cmp(&a.importance())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                all.truncate(limit);
                all
            }
        };

        // Retrieval is itself a signal: bump access on everything returned.
        let now = Utc::now();
        for record in &mut hits {
            record.record_access(now);
            self.records.upsert(record).await.map_err(MemoryError::store)?;
        }

        Ok(hits)
    }

    async fn get(&self, id: MemoryId) -> Result<Option<MemoryRecord>, MemoryError> {
        self.records.get(id).await.map_err(MemoryError::store)
    }

    async fn reinforce(&self, id: MemoryId, delta: f64) -> Result<f64, MemoryError> {
        let mut record = self
            .records
            .get(id)
            .await
            .map_err(MemoryError::store)?
            .ok_or(MemoryError::RecordNotFound(id))?;

        record.reinforce(delta);
        self.records.upsert(&record).await.map_err(MemoryError::store)?;

        self.events
            .publish(MemoryEvent::RecordReinforced {
                id,
                delta,
                importance: record.importance(),
                at: Utc::now(),
            })
            .await;

        Ok(record.importance())
    }

    async fn decay_pass(&self) -> Result<DecayReport, MemoryError> {
        let horizon = Duration::days(self.config.staleness_horizon_days);
        let now = Utc::now();
        let all = self
            .records
            .list(&RecordFilter::default())
            .await
            .map_err(MemoryError::store)?;

        let mut report = DecayReport { examined: all.len(), ..Default::default() };
        for mut record in all {
            match record.evaluate_decay(
                horizon,
                self.config.decay_ceiling,
                self.config.decay_constant,
                self.config.prune_threshold,
                now,
            ) {
                DecayDisposition::Untouched => {}
                DecayDisposition::Decayed => {
                    self.records.upsert(&record).await.map_err(MemoryError::store)?;
                    report.decayed += 1;
                }
                DecayDisposition::Prune => {
                    self.records.delete(record.id).await.map_err(MemoryError::store)?;
                    report.pruned += 1;
                }
            }
        }

        debug!(examined = report.examined, decayed = report.decayed, pruned = report.pruned, "decay pass complete");
        self.events
            .publish(MemoryEvent::DecayCompleted {
                decayed: report.decayed,
                pruned: report.pruned,
                at: now,
            })
            .await;

        Ok(report)
    }

    async fn consolidate_pass(&self) -> Result<usize, MemoryError> {
        let all = self
            .records
            .list(&RecordFilter::default())
            .await
            .map_err(MemoryError::store)?;

        // Group by owner and category; only same-group records may merge.
        let mut groups: std::collections::HashMap<(String, String), Vec<MemoryRecord>> =
            std::collections::HashMap::new();
        for record in all {
            groups
                .entry((record.owner.clone(), record.category.clone()))
                .or_default()
                .push(record);
        }

        let mut merged = 0usize;
        for (_, mut group) in groups {
            if group.len() < 2 {
                continue;
            }
            // Strongest record first so it survives as the merge target.
            group.sort_by(|a, b| {
                b.importance()
                    .partial_cmp(&a.importance())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut consumed = vec![false; group.len()];
            for i in 0..group.len() {
                if consumed[i] || group[i].unembedded {
                    continue;
                }
                let mut survivor = group[i].clone();
                let mut changed = false;
                for j in (i + 1)..group.len() {
                    if consumed[j] || group[j].unembedded {
                        continue;
                    }
                    let similarity = crate::domain::cosine_similarity(
                        &survivor.embedding,
                        &group[j].embedding,
                    );
                    if similarity > self.config.consolidation_threshold {
                        survivor.absorb(&group[j]);
                        self.records.delete(group[j].id).await.map_err(MemoryError::store)?;
                        consumed[j] = true;
                        changed = true;
                        merged += 1;
                    }
                }
                if changed {
                    self.records.upsert(&survivor).await.map_err(MemoryError::store)?;
                }
            }
        }

        debug!(merged, "consolidation pass complete");
        self.events
            .publish(MemoryEvent::ConsolidationCompleted { merged, at: Utc::now() })
            .await;

        Ok(merged)
    }

    async fn record_decision(&self, decision: &DecisionRecord) -> Result<(), MemoryError> {
        self.decisions.upsert(decision).await.map_err(MemoryError::store)?;
        self.events
            .publish(MemoryEvent::DecisionRecorded {
                id: decision.id,
                decision_type: decision.decision_type.clone(),
                at: Utc::now(),
            })
            .await;
        Ok(())
    }

    async fn decision(&self, id: DecisionId) -> Result<Option<DecisionRecord>, MemoryError> {
        self.decisions.get(id).await.map_err(MemoryError::store)
    }

    async fn resolve_decision(
        &self,
        id: DecisionId,
        outcome: &str,
        success: bool,
    ) -> Result<DecisionRecord, MemoryError> {
        let mut decision = self
            .decisions
            .get(id)
            .await
            .map_err(MemoryError::store)?
            .ok_or(MemoryError::DecisionNotFound(id))?;

        decision.resolve(outcome, success)?;
        self.decisions.upsert(&decision).await.map_err(MemoryError::store)?;

        self.events
            .publish(MemoryEvent::DecisionResolved { id, success, at: Utc::now() })
            .await;

        Ok(decision)
    }

    async fn decisions_for_type(
        &self,
        decision_type: &str,
    ) -> Result<Vec<DecisionRecord>, MemoryError> {
        self.decisions.list_by_type(decision_type).await.map_err(MemoryError::store)
    }

    async fn decisions_since(
        &self,
        since: chrono::DateTime<Utc>,
    ) -> Result<Vec<DecisionRecord>, MemoryError> {
        self.decisions.list_since(since).await.map_err(MemoryError::store)
    }

    async fn upsert_pattern(&self, pattern: &Pattern) -> Result<(), MemoryError> {
        self.patterns.upsert(pattern).await.map_err(MemoryError::store)?;
        self.events
            .publish(MemoryEvent::PatternUpserted {
                name: pattern.name.clone(),
                occurrences: pattern.occurrences,
                success_rate: pattern.success_rate,
                at: Utc::now(),
            })
            .await;
        Ok(())
    }

    async fn pattern(&self, name: &str) -> Result<Option<Pattern>, MemoryError> {
        self.patterns.get(name).await.map_err(MemoryError::store)
    }

    async fn patterns(&self) -> Result<Vec<Pattern>, MemoryError> {
        self.patterns.list().await.map_err(MemoryError::store)
    }

    async fn add_objective(&self, topic: &str, priority: f64) -> Result<ObjectiveId, MemoryError> {
        let objective = LearningObjective::new(topic, priority);
        let id = objective.id;
        self.objectives.upsert(&objective).await.map_err(MemoryError::store)?;
        Ok(id)
    }

    async fn open_objectives(&self) -> Result<Vec<LearningObjective>, MemoryError> {
        self.objectives.list_open().await.map_err(MemoryError::store)
    }

    async fn advance_objective(
        &self,
        id: ObjectiveId,
        progress: f64,
        knowledge: &str,
    ) -> Result<LearningObjective, MemoryError> {
        let mut objective = self
            .objectives
            .get(id)
            .await
            .map_err(MemoryError::store)?
            .ok_or(MemoryError::ObjectiveNotFound(id))?;

        objective.advance(progress, knowledge);
        self.objectives.upsert(&objective).await.map_err(MemoryError::store)?;

        self.events
            .publish(MemoryEvent::ObjectiveAdvanced {
                topic: objective.topic.clone(),
                progress: objective.progress(),
                completed: !objective.is_open(),
                at: Utc::now(),
            })
            .await;

        Ok(objective)
    }

    async fn stats(&self) -> Result<MemoryStats, MemoryError> {
        let records = self.records.count().await.map_err(MemoryError::store)?;
        let decisions = self.decisions.count().await.map_err(MemoryError::store)?;
        let patterns = self.patterns.count().await.map_err(MemoryError::store)?;
        let open_objectives =
            self.open_objectives().await?.len() as u64;
        Ok(MemoryStats { records, decisions, patterns, open_objectives })
    }
}
