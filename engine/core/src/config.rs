// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Engine configuration.
//!
//! Every scoring weight, threshold and interval in the engine is a tunable
//! default here rather than a literal at the use site. `from_env` is the
//! fail-fast startup path: a deployment without its external endpoints is a
//! configuration error, not a runtime surprise.

use crate::domain::worker::WorkerRole;
use crate::error::EngineError;

/// Weights used by the decision engine's scoring pass.
#[derive(Debug, Clone)]
pub struct DecisionWeights {
    /// Score adjustment per matching historical outcome (+ on success,
    /// - on failure).
    pub history_weight: f64,

    /// Multiplier on the mean importance of the top relevant memories.
    pub context_weight: f64,

    /// How many relevant memories the context term considers.
    pub relevant_memory_limit: usize,

    /// Reinforcement delta applied to related memories on a successful
    /// outcome.
    pub success_reinforcement: f64,

    /// Importance of the avoidance memory written on a failed outcome.
    /// Deliberately above `success_reinforcement`: failures teach faster.
    pub failure_importance: f64,
}

impl Default for DecisionWeights {
    fn default() -> Self {
        Self {
            history_weight: 0.2,
            context_weight: 0.3,
            relevant_memory_limit: 5,
            success_reinforcement: 0.75,
            failure_importance: 0.9,
        }
    }
}

/// Intervals and bounds for the background cognition cycles.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub observation_interval_secs: u64,
    pub maintenance_interval_secs: u64,
    pub mining_interval_secs: u64,
    pub synthesis_interval_secs: u64,

    /// Backoff after a failed cycle iteration, doubling up to the cap.
    pub backoff_base_secs: u64,
    pub backoff_cap_secs: u64,

    /// Trailing window the mining cycle aggregates over.
    pub mining_window_hours: i64,

    /// Failed outcomes of one decision type within the window before a
    /// failure pattern is recorded.
    pub failure_pattern_threshold: usize,

    /// Memories retrieved per objective by the synthesis cycle.
    pub synthesis_top_k: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            observation_interval_secs: 30,
            maintenance_interval_secs: 3600,
            mining_interval_secs: 600,
            synthesis_interval_secs: 900,
            backoff_base_secs: 2,
            backoff_cap_secs: 300,
            mining_window_hours: 24,
            failure_pattern_threshold: 3,
            synthesis_top_k: 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Worker every run enters the graph at.
    pub entry_worker: WorkerRole,

    /// Hard cap on worker steps per run; exceeding it forces Terminal.
    pub step_budget: u32,

    /// Timeout applied to each worker step.
    pub step_timeout_secs: u64,

    /// Memory records snapshotted into the run context before each step.
    pub memory_context_limit: usize,

    /// Trailing window of decisions shown to workers, in minutes.
    pub decision_context_minutes: i64,

    pub weights: DecisionWeights,
    pub scheduler: SchedulerConfig,

    pub reasoning_endpoint: Option<String>,
    pub embedding_endpoint: Option<String>,
    pub database_url: Option<String>,
}

impl EngineConfig {
    pub fn new(entry_worker: WorkerRole) -> Self {
        Self {
            entry_worker,
            step_budget: 32,
            step_timeout_secs: 60,
            memory_context_limit: 5,
            decision_context_minutes: 60,
            weights: DecisionWeights::default(),
            scheduler: SchedulerConfig::default(),
            reasoning_endpoint: None,
            embedding_endpoint: None,
            database_url: None,
        }
    }

    /// Build from environment, failing fast when a required external
    /// endpoint is missing.
    ///
    /// Required: `ATRIUM_REASONING_ENDPOINT`, `ATRIUM_EMBEDDING_ENDPOINT`.
    /// Optional: `ATRIUM_DATABASE_URL` (in-memory repositories otherwise),
    /// `ATRIUM_ENTRY_WORKER` (defaults to `coordinator`),
    /// `ATRIUM_STEP_BUDGET`.
    pub fn from_env() -> Result<Self, EngineError> {
        let reasoning_endpoint = require_env("ATRIUM_REASONING_ENDPOINT")?;
        let embedding_endpoint = require_env("ATRIUM_EMBEDDING_ENDPOINT")?;

        let entry_worker = WorkerRole::new(
            std::env::var("ATRIUM_ENTRY_WORKER").unwrap_or_else(|_| "coordinator".to_string()),
        );

        let mut config = Self::new(entry_worker);
        config.reasoning_endpoint = Some(reasoning_endpoint);
        config.embedding_endpoint = Some(embedding_endpoint);
        config.database_url = std::env::var("ATRIUM_DATABASE_URL").ok();

        if let Ok(raw) = std::env::var("ATRIUM_STEP_BUDGET") {
            config.step_budget = raw.parse().map_err(|_| {
                EngineError::Configuration(format!("ATRIUM_STEP_BUDGET is not a number: {raw}"))
            })?;
        }

        Ok(config)
    }
}

fn require_env(name: &str) -> Result<String, EngineError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| EngineError::Configuration(format!("required environment variable {name} is not set")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_documented_weights() {
        let config = EngineConfig::new(WorkerRole::new("coordinator"));
        assert_eq!(config.step_budget, 32);
        assert_eq!(config.weights.history_weight, 0.2);
        assert_eq!(config.weights.context_weight, 0.3);
        assert!(config.weights.failure_importance > config.weights.success_reinforcement);
    }

    #[test]
    fn from_env_fails_fast_without_endpoints() {
        std::env::remove_var("ATRIUM_REASONING_ENDPOINT");
        let err = EngineConfig::from_env().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
