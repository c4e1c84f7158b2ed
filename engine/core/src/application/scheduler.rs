// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # Cognition scheduler — background maintenance of the memory store
//!
//! Four independent periodic cycles run against the shared store without
//! ever blocking the synchronous engine API:
//!
//! | cycle        | default period | work |
//! |--------------|----------------|------|
//! | observation  | 30 s           | heartbeat memory of aggregate counters |
//! | maintenance  | 1 h            | decay pass, then consolidation pass |
//! | mining       | 10 min         | trailing-window success rates per decision type |
//! | synthesis    | 15 min         | advance open learning objectives |
//!
//! The cycles are supervised as one group: a failed iteration is retried
//! after exponential backoff instead of killing the task, and shutdown
//! cancels all of them together, each finishing its current iteration first.

use std::sync::Arc;
use std::time::Duration;

use atrium_memory::{MemoryQuery, MemoryStore, Pattern, PatternKind, GLOBAL_OWNER};
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::EngineError;

pub struct CognitionScheduler {
    store: Arc<dyn MemoryStore>,
    config: SchedulerConfig,
    token: CancellationToken,
}

/// Handle to the running cycle group.
pub struct SchedulerHandle {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Cancel every cycle and wait for each to finish its current
    /// iteration.
    pub async fn shutdown(self) {
        self.token.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl CognitionScheduler {
    pub fn new(store: Arc<dyn MemoryStore>, config: SchedulerConfig) -> Self {
        Self { store, config, token: CancellationToken::new() }
    }

    /// Spawn the four cycles. The returned handle owns them as a group.
    pub fn start(self) -> SchedulerHandle {
        let scheduler = Arc::new(self);
        let token = scheduler.token.clone();

        info!(
            observation_secs = scheduler.config.observation_interval_secs,
            maintenance_secs = scheduler.config.maintenance_interval_secs,
            mining_secs = scheduler.config.mining_interval_secs,
            synthesis_secs = scheduler.config.synthesis_interval_secs,
            "starting cognition cycles"
        );

        let handles = vec![
            scheduler.clone().spawn_cycle(
                "observation",
                scheduler.config.observation_interval_secs,
                |s| Box::pin(async move { s.observation_cycle().await }),
            ),
            scheduler.clone().spawn_cycle(
                "maintenance",
                scheduler.config.maintenance_interval_secs,
                |s| Box::pin(async move { s.maintenance_cycle().await }),
            ),
            scheduler.clone().spawn_cycle(
                "mining",
                scheduler.config.mining_interval_secs,
                |s| Box::pin(async move { s.mining_cycle().await }),
            ),
            scheduler.clone().spawn_cycle(
                "synthesis",
                scheduler.config.synthesis_interval_secs,
                |s| Box::pin(async move { s.synthesis_cycle().await }),
            ),
        ];

        SchedulerHandle { token, handles }
    }

    fn spawn_cycle(
        self: Arc<Self>,
        name: &'static str,
        interval_secs: u64,
        cycle: fn(
            Arc<Self>,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<(), EngineError>> + Send>,
        >,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(interval_secs.max(1)));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let base = Duration::from_secs(self.config.backoff_base_secs.max(1));
            let cap = Duration::from_secs(self.config.backoff_cap_secs.max(1));
            let mut backoff = base;

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        match cycle(self.clone()).await {
                            Ok(()) => {
                                backoff = base;
                                metrics::counter!("atrium_cognition_cycles_total", "cycle" => name)
                                    .increment(1);
                            }
                            Err(e) => {
                                warn!(cycle = name, error = %e, retry_in = ?backoff, "cycle failed, backing off");
                                // Never die on failure; wait out the backoff
                                // unless shutdown arrives first.
                                tokio::select! {
                                    _ = tokio::time::sleep(backoff) => {}
                                    _ = self.token.cancelled() => break,
                                }
                                backoff = (backoff * 2).min(cap);
                            }
                        }
                    }
                    _ = self.token.cancelled() => break,
                }
            }
            debug!(cycle = name, "cognition cycle stopped");
        })
    }

    /// Heartbeat: a low-importance memory summarising aggregate counters.
    pub async fn observation_cycle(&self) -> Result<(), EngineError> {
        let stats = self.store.stats().await?;
        let content = serde_json::json!({
            "heartbeat": {
                "records": stats.records,
                "decisions": stats.decisions,
                "patterns": stats.patterns,
                "open_objectives": stats.open_objectives,
            },
        });
        self.store
            .insert(GLOBAL_OWNER, "observation", content, Some(0.1))
            .await?;
        Ok(())
    }

    /// Decay then consolidate the whole store.
    pub async fn maintenance_cycle(&self) -> Result<(), EngineError> {
        let report = self.store.decay_pass().await?;
        let merged = self.store.consolidate_pass().await?;
        debug!(
            decayed = report.decayed,
            pruned = report.pruned,
            merged,
            "maintenance cycle complete"
        );
        Ok(())
    }

    /// Group trailing-window decisions by type and upsert a stat pattern per
    /// type; types failing repeatedly also get a failure pattern.
    pub async fn mining_cycle(&self) -> Result<(), EngineError> {
        let since = Utc::now() - chrono::Duration::hours(self.config.mining_window_hours);
        let recent = self.store.decisions_since(since).await?;

        let mut by_type: std::collections::HashMap<&str, Vec<&atrium_memory::DecisionRecord>> =
            std::collections::HashMap::new();
        for decision in &recent {
            by_type.entry(decision.decision_type.as_str()).or_default().push(decision);
        }

        for (decision_type, decisions) in by_type {
            let resolved: Vec<_> = decisions.iter().filter(|d| d.success.is_some()).collect();
            if resolved.is_empty() {
                continue;
            }
            let successes = resolved.iter().filter(|d| d.success == Some(true)).count();
            let failures = resolved.len() - successes;
            let rate = successes as f64 / resolved.len() as f64;
            let contributing: Vec<_> = resolved.iter().map(|d| d.id).collect();

            self.upsert_observed(
                format!("decision-stat:{decision_type}"),
                PatternKind::DecisionStat,
                rate,
                &contributing,
            )
            .await?;

            if failures >= self.config.failure_pattern_threshold {
                self.upsert_observed(
                    format!("failure:{decision_type}"),
                    PatternKind::Failure,
                    rate,
                    &contributing,
                )
                .await?;
            }
        }

        Ok(())
    }

    async fn upsert_observed(
        &self,
        name: String,
        kind: PatternKind,
        rate: f64,
        contributing: &[atrium_memory::DecisionId],
    ) -> Result<(), EngineError> {
        let pattern = match self.store.pattern(&name).await? {
            Some(mut existing) => {
                existing.observe(rate, contributing);
                existing
            }
            None => {
                let mut fresh = Pattern::new(name, kind, rate);
                fresh.contributing = contributing.to_vec();
                fresh
            }
        };
        self.store.upsert_pattern(&pattern).await?;
        Ok(())
    }

    /// Advance each open objective with a confidence-weighted summary of its
    /// top matching memories. Progress never regresses.
    pub async fn synthesis_cycle(&self) -> Result<(), EngineError> {
        let objectives = self.store.open_objectives().await?;

        for objective in objectives {
            let hits = self
                .store
                .query(&MemoryQuery::text(objective.topic.clone(), self.config.synthesis_top_k))
                .await?;
            if hits.is_empty() {
                continue;
            }

            let coverage = hits.len() as f64 / self.config.synthesis_top_k as f64;
            let quality: f64 = hits
                .iter()
                .map(|m| m.confidence * m.importance())
                .sum::<f64>()
                / hits.len() as f64;
            let progress = (0.5 * coverage + 0.5 * quality).clamp(0.0, 1.0);

            // Extractive summary, strongest evidence first.
            let mut ranked = hits;
            ranked.sort_by(|a, b| {
                (b.confidence * b.importance())
                    .partial_cmp(&(a.confidence * a.importance()))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let knowledge = ranked
                .iter()
                .take(3)
                .map(|m| format!("[{:.2}] {}", m.confidence * m.importance(), m.content))
                .collect::<Vec<_>>()
                .join("\n");

            let updated = self
                .store
                .advance_objective(objective.id, progress, &knowledge)
                .await?;
            debug!(topic = %updated.topic, progress = updated.progress(), "objective advanced");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_memory::{
        HashEmbedding, InMemoryDecisionRepository, InMemoryObjectiveRepository,
        InMemoryPatternRepository, InMemoryRecordRepository, DecisionRecord, MemoryConfig,
        StandardMemoryStore,
    };
    use serde_json::json;

    fn store() -> Arc<dyn MemoryStore> {
        Arc::new(StandardMemoryStore::new(
            Arc::new(InMemoryRecordRepository::new()),
            Arc::new(InMemoryDecisionRepository::new()),
            Arc::new(InMemoryPatternRepository::new()),
            Arc::new(InMemoryObjectiveRepository::new()),
            Arc::new(HashEmbedding::with_dimension(16)),
            MemoryConfig::default(),
        ))
    }

    fn scheduler(store: Arc<dyn MemoryStore>) -> CognitionScheduler {
        CognitionScheduler::new(store, SchedulerConfig::default())
    }

    async fn resolved_decision(
        store: &Arc<dyn MemoryStore>,
        decision_type: &str,
        option: &str,
        success: bool,
    ) {
        let decision =
            DecisionRecord::new(decision_type, json!({}), vec![option.into()], option, 0.5);
        store.record_decision(&decision).await.unwrap();
        store
            .resolve_decision(decision.id, if success { "ok" } else { "failed" }, success)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn observation_writes_a_low_importance_heartbeat() {
        let shared = store();
        let s = scheduler(shared.clone());
        s.observation_cycle().await.unwrap();

        let hits = shared
            .query(&MemoryQuery {
                category: Some("observation".into()),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].importance() - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn mining_upserts_a_stat_pattern_per_decision_type() {
        let shared = store();
        resolved_decision(&shared, "pricing", "A", true).await;
        resolved_decision(&shared, "pricing", "A", true).await;
        resolved_decision(&shared, "pricing", "B", false).await;
        resolved_decision(&shared, "staffing", "crew-2", true).await;

        scheduler(shared.clone()).mining_cycle().await.unwrap();

        let pricing = shared.pattern("decision-stat:pricing").await.unwrap().unwrap();
        assert!((pricing.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(pricing.contributing.len(), 3);

        let staffing = shared.pattern("decision-stat:staffing").await.unwrap().unwrap();
        assert_eq!(staffing.success_rate, 1.0);
    }

    #[tokio::test]
    async fn repeated_failures_mint_a_failure_pattern() {
        let shared = store();
        for _ in 0..3 {
            resolved_decision(&shared, "collections", "dun", false).await;
        }

        scheduler(shared.clone()).mining_cycle().await.unwrap();

        let failure = shared.pattern("failure:collections").await.unwrap().unwrap();
        assert_eq!(failure.kind, PatternKind::Failure);
        assert_eq!(failure.success_rate, 0.0);
    }

    #[tokio::test]
    async fn re_mining_folds_with_a_moving_average() {
        let shared = store();
        resolved_decision(&shared, "pricing", "A", true).await;

        let s = scheduler(shared.clone());
        s.mining_cycle().await.unwrap();
        let first = shared.pattern("decision-stat:pricing").await.unwrap().unwrap();
        assert_eq!(first.success_rate, 1.0);

        resolved_decision(&shared, "pricing", "A", false).await;
        s.mining_cycle().await.unwrap();
        let second = shared.pattern("decision-stat:pricing").await.unwrap().unwrap();
        // EMA of (1.0, sample 0.5), not a hard overwrite.
        assert!((second.success_rate - 0.95).abs() < 1e-9);
        assert_eq!(second.occurrences, 2);
    }

    #[tokio::test]
    async fn synthesis_progress_is_monotone_across_cycles() {
        let shared = store();
        let id = shared.add_objective("invoice latency", 0.9).await.unwrap();
        shared
            .insert(GLOBAL_OWNER, "note", json!("invoice latency"), Some(0.8))
            .await
            .unwrap();

        let s = scheduler(shared.clone());
        s.synthesis_cycle().await.unwrap();
        let after_first = objective_progress(&shared, id).await;
        assert!(after_first > 0.0);

        // A second pass over the same evidence cannot regress progress.
        s.synthesis_cycle().await.unwrap();
        let after_second = objective_progress(&shared, id).await;
        assert!(after_second >= after_first);
    }

    #[tokio::test]
    async fn synthesis_skips_objectives_without_evidence() {
        let shared = store();
        let id = shared.add_objective("unknown topic", 0.5).await.unwrap();
        scheduler(shared.clone()).synthesis_cycle().await.unwrap();
        assert_eq!(objective_progress(&shared, id).await, 0.0);
    }

    #[tokio::test]
    async fn cycle_group_cancels_together() {
        let shared = store();
        let mut config = SchedulerConfig::default();
        config.observation_interval_secs = 1;
        config.maintenance_interval_secs = 1;
        config.mining_interval_secs = 1;
        config.synthesis_interval_secs = 1;

        let handle = CognitionScheduler::new(shared.clone(), config).start();
        // First observation tick fires immediately.
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown().await;

        let stats = shared.stats().await.unwrap();
        assert!(stats.records >= 1);
    }

    async fn objective_progress(store: &Arc<dyn MemoryStore>, id: atrium_memory::ObjectiveId) -> f64 {
        // Completed objectives drop out of the open list; read via open list
        // or fall back to zero progress meaning untouched.
        store
            .open_objectives()
            .await
            .unwrap()
            .into_iter()
            .find(|o| o.id == id)
            .map(|o| o.progress())
            .unwrap_or(1.0)
    }
}
