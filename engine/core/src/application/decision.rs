// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # Decision engine
//!
//! Scores candidate options against decision history and the associative
//! memory, persists an auditable [`DecisionRecord`] before answering, and
//! feeds outcomes back into the store.
//!
//! ## Scoring
//!
//! Every option starts at 0.5. Each resolved historical decision of the same
//! type that chose the option moves it by ±`history_weight`. The mean
//! importance of the top relevant memories, scaled by `context_weight`, is
//! added to all options. Scores clamp to [0,1]; ties break to the
//! first-listed option, so an empty store deterministically yields the first
//! option at exactly 0.5.
//!
//! ## Learning asymmetry
//!
//! A successful outcome reinforces the memories that informed the decision;
//! a failed outcome writes a high-importance avoidance memory. The failure
//! weight exceeds the success weight, so the store learns faster from
//! mistakes. Failure *patterns* are left to the mining cycle — nothing on
//! this path creates patterns synchronously.

use std::sync::Arc;

use atrium_memory::{DecisionId, DecisionRecord, MemoryQuery, MemoryStore, GLOBAL_OWNER};
use tracing::{debug, warn};

use crate::config::DecisionWeights;
use crate::error::EngineError;

pub struct DecisionEngine {
    store: Arc<dyn MemoryStore>,
    weights: DecisionWeights,
}

impl DecisionEngine {
    pub fn new(store: Arc<dyn MemoryStore>, weights: DecisionWeights) -> Self {
        Self { store, weights }
    }

    /// Choose among `options` for a decision of `decision_type`.
    ///
    /// The decision record is persisted before this returns; if persistence
    /// fails the caller gets a typed error, never a fabricated decision.
    pub async fn make_decision(
        &self,
        decision_type: &str,
        context: serde_json::Value,
        options: &[String],
    ) -> Result<DecisionRecord, EngineError> {
        if options.is_empty() {
            return Err(EngineError::InvariantViolation(
                "make_decision requires at least one candidate option".into(),
            ));
        }

        let history = self.store.decisions_for_type(decision_type).await?;
        let resolved: Vec<&DecisionRecord> =
            history.iter().filter(|d| d.success.is_some()).collect();

        let context_text = match &context {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let memories = self
            .store
            .query(&MemoryQuery::text(context_text, self.weights.relevant_memory_limit))
            .await?;

        let context_term = if memories.is_empty() {
            0.0
        } else {
            let mean: f64 = memories.iter().map(|m| m.importance()).sum::<f64>()
                / memories.len() as f64;
            mean * self.weights.context_weight
        };

        let mut best_index = 0;
        let mut best_score = f64::MIN;
        let mut scores = Vec::with_capacity(options.len());
        for (index, option) in options.iter().enumerate() {
            let mut score = 0.5 + context_term;
            for decision in &resolved {
                if &decision.chosen_option == option {
                    match decision.success {
                        Some(true) => score += self.weights.history_weight,
                        Some(false) => score -= self.weights.history_weight,
                        None => {}
                    }
                }
            }
            let score = score.clamp(0.0, 1.0);
            scores.push(score);
            // Strictly greater: earlier options win ties.
            if score > best_score {
                best_score = score;
                best_index = index;
            }
        }

        debug!(
            decision_type,
            chosen = %options[best_index],
            confidence = best_score,
            memories_consulted = memories.len(),
            decisions_consulted = resolved.len(),
            "decision scored"
        );

        let audited_context = serde_json::json!({
            "context": context,
            "memories_consulted": memories.len(),
            "decisions_consulted": resolved.len(),
            "scores": scores,
        });

        let decision = DecisionRecord::new(
            decision_type,
            audited_context,
            options.to_vec(),
            options[best_index].clone(),
            best_score,
        );
        self.store.record_decision(&decision).await?;

        metrics::counter!("atrium_decisions_total").increment(1);
        Ok(decision)
    }

    /// Report the real-world outcome of an earlier decision. Exactly once;
    /// a second report is rejected and the first outcome preserved.
    pub async fn report_outcome(
        &self,
        id: DecisionId,
        outcome: &str,
        success: bool,
    ) -> Result<DecisionRecord, EngineError> {
        let decision = self.store.resolve_decision(id, outcome, success).await?;

        if success {
            // Strengthen whatever knowledge informed this choice.
            let related = self
                .store
                .query(&MemoryQuery::text(
                    decision.decision_type.clone(),
                    self.weights.relevant_memory_limit,
                ))
                .await?;
            for memory in &related {
                if let Err(e) = self
                    .store
                    .reinforce(memory.id, self.weights.success_reinforcement)
                    .await
                {
                    warn!(memory_id = %memory.id, error = %e, "failed to reinforce memory");
                }
            }
        } else {
            let avoidance = serde_json::json!({
                "decision_type": decision.decision_type,
                "avoid_option": decision.chosen_option,
                "outcome": outcome,
            });
            self.store
                .insert(
                    GLOBAL_OWNER,
                    "avoidance",
                    avoidance,
                    Some(self.weights.failure_importance),
                )
                .await?;
        }

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_memory::{
        HashEmbedding, InMemoryDecisionRepository, InMemoryObjectiveRepository,
        InMemoryPatternRepository, InMemoryRecordRepository, MemoryConfig, StandardMemoryStore,
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

    fn engine(store: Arc<dyn MemoryStore>) -> DecisionEngine {
        DecisionEngine::new(store, DecisionWeights::default())
    }

    fn options(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn empty_store_returns_first_option_at_exactly_half() {
        let engine = engine(store());
        let decision = engine
            .make_decision("pricing", json!({"type": "pricing"}), &options(&["A", "B"]))
            .await
            .unwrap();
        assert_eq!(decision.chosen_option, "A");
        assert_eq!(decision.confidence, 0.5);
    }

    #[tokio::test]
    async fn prior_success_raises_confidence_above_seven_tenths() {
        let shared = store();
        let engine = engine(shared.clone());

        let first = engine
            .make_decision("pricing", json!({"job": "hansen"}), &options(&["A", "B"]))
            .await
            .unwrap();
        shared.resolve_decision(first.id, "won", true).await.unwrap();

        let second = engine
            .make_decision("pricing", json!({"job": "hansen"}), &options(&["A", "B"]))
            .await
            .unwrap();
        assert_eq!(second.chosen_option, "A");
        assert!(second.confidence >= 0.7);
    }

    #[tokio::test]
    async fn prior_failure_steers_away_from_the_option() {
        let shared = store();
        let engine = engine(shared.clone());

        let first = engine
            .make_decision("pricing", json!({}), &options(&["A", "B"]))
            .await
            .unwrap();
        // Outcome reporting writes an avoidance memory with non-zero
        // importance, which feeds the context term of the next decision.
        engine.report_outcome(first.id, "customer balked", false).await.unwrap();

        let second = engine
            .make_decision("pricing", json!({}), &options(&["A", "B"]))
            .await
            .unwrap();
        assert_eq!(second.chosen_option, "B");
    }

    #[tokio::test]
    async fn decision_is_persisted_before_returning() {
        let shared = store();
        let engine = engine(shared.clone());
        let decision = engine
            .make_decision("scheduling", json!({}), &options(&["crew-1"]))
            .await
            .unwrap();
        let stored = shared.decision(decision.id).await.unwrap().unwrap();
        assert_eq!(stored.chosen_option, "crew-1");
        assert_eq!(stored.input_context["decisions_consulted"], json!(0));
    }

    #[tokio::test]
    async fn second_outcome_report_is_rejected() {
        let shared = store();
        let engine = engine(shared.clone());
        let decision = engine
            .make_decision("pricing", json!({}), &options(&["A"]))
            .await
            .unwrap();

        engine.report_outcome(decision.id, "won", true).await.unwrap();
        let err = engine.report_outcome(decision.id, "lost", false).await.unwrap_err();
        assert!(matches!(err, EngineError::OutcomeAlreadyReported(_)));

        let stored = shared.decision(decision.id).await.unwrap().unwrap();
        assert_eq!(stored.outcome.as_deref(), Some("won"));
    }

    #[tokio::test]
    async fn unknown_decision_id_is_a_typed_miss() {
        let engine = engine(store());
        let err = engine
            .report_outcome(DecisionId::new(), "won", true)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DecisionNotFound(_)));
    }

    #[tokio::test]
    async fn failure_writes_a_high_importance_avoidance_memory() {
        let shared = store();
        let engine = engine(shared.clone());
        let decision = engine
            .make_decision("pricing", json!({}), &options(&["A"]))
            .await
            .unwrap();
        engine.report_outcome(decision.id, "churned", false).await.unwrap();

        let avoidance = shared
            .query(&MemoryQuery {
                category: Some("avoidance".into()),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(avoidance.len(), 1);
        assert_eq!(avoidance[0].importance(), 0.9);
    }

    #[tokio::test]
    async fn empty_options_are_an_invariant_violation() {
        let engine = engine(store());
        let err = engine.make_decision("pricing", json!({}), &[]).await.unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
    }
}
