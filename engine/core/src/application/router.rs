// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # Router — the orchestration graph executor
//!
//! Drives one run from Entry through worker states to Terminal:
//!
//! ```text
//! loop {
//!     snapshot memory context
//!     output = step(current worker)        // timeout-bounded, errors caught
//!     if output proposes workers:
//!         next = first proposal; queue the rest
//!     else if pending queue non-empty:
//!         next = pop earliest
//!     else:
//!         Terminal
//! }
//! ```
//!
//! Execution is strictly sequential; the run state is owned by its run. A
//! failing step is appended to the error list and routing continues — one
//! bad worker never halts a run. A configurable step budget forces Terminal
//! so cyclic graphs cannot livelock, and cancellation is honoured only at
//! step boundaries, never mid-step.

use std::sync::Arc;
use std::time::Duration;

use atrium_memory::{MemoryQuery, MemoryStore};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::registry::WorkerRegistry;
use crate::application::worker::StepContext;
use crate::config::EngineConfig;
use crate::domain::run::{RunReport, RunState};
use crate::domain::worker::WorkerRole;

pub struct Router {
    registry: Arc<WorkerRegistry>,
    store: Arc<dyn MemoryStore>,
    config: Arc<EngineConfig>,
}

impl Router {
    pub fn new(
        registry: Arc<WorkerRegistry>,
        store: Arc<dyn MemoryStore>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self { registry, store, config }
    }

    /// Execute a run to Terminal. Always returns a report; failures along
    /// the way accumulate in `errors`.
    pub async fn submit_run(&self, initial_message: &str) -> RunReport {
        self.submit_run_with_cancellation(initial_message, CancellationToken::new())
            .await
    }

    /// As [`submit_run`](Self::submit_run), but cancellable between steps.
    pub async fn submit_run_with_cancellation(
        &self,
        initial_message: &str,
        cancel: CancellationToken,
    ) -> RunReport {
        let mut run = RunState::new(initial_message);
        info!(run_id = %run.id, entry = %self.config.entry_worker, "run started");

        let mut current = Some(self.config.entry_worker.clone());

        while let Some(role) = current.take() {
            if cancel.is_cancelled() {
                run.record_error("router", "run cancelled");
                break;
            }
            if run.metrics.steps >= self.config.step_budget {
                run.record_error(role.as_str(), "step-budget-exceeded");
                warn!(run_id = %run.id, budget = self.config.step_budget, "step budget exceeded, forcing terminal");
                break;
            }

            let proposals = self.execute_step(&mut run, &role).await;

            // A fresh suggestion outranks the backlog: the first proposal is
            // executed next and the remainder queued; only a step with no
            // proposals falls back to the earliest pending entry, and an
            // empty queue means Terminal.
            current = if proposals.is_empty() {
                run.pending.pop_front()
            } else {
                let mut proposals = proposals.into_iter();
                let next = proposals.next();
                run.pending.extend(proposals);
                next
            };
        }

        metrics::counter!("atrium_runs_total").increment(1);
        info!(
            run_id = %run.id,
            steps = run.metrics.steps,
            errors = run.metrics.errors,
            "run reached terminal"
        );
        run.into_report()
    }

    /// Run one worker step, recording output or failure on the run state.
    /// Returns the step's validated routing proposals in order.
    async fn execute_step(&self, run: &mut RunState, role: &WorkerRole) -> Vec<WorkerRole> {
        let registration = match self.registry.get(role) {
            Ok(r) => r.clone(),
            Err(e) => {
                run.record_error(role.as_str(), e.to_string());
                return Vec::new();
            }
        };

        run.metrics.steps += 1;
        metrics::counter!("atrium_run_steps_total").increment(1);

        // Snapshot context for this step. Store trouble degrades to an empty
        // snapshot; the step still runs.
        run.memory_context = match self
            .store
            .query(&MemoryQuery {
                text: run.final_message().map(str::to_string),
                limit: self.config.memory_context_limit,
                ..Default::default()
            })
            .await
        {
            Ok(records) => records,
            Err(e) => {
                warn!(run_id = %run.id, error = %e, "memory snapshot unavailable");
                Vec::new()
            }
        };

        let since = Utc::now() - chrono::Duration::minutes(self.config.decision_context_minutes);
        let recent_decisions = self.store.decisions_since(since).await.unwrap_or_default();

        let timeout = Duration::from_secs(self.config.step_timeout_secs);
        let outcome = {
            let step = registration.handler.step(
                &registration.descriptor,
                StepContext {
                    run,
                    memories: &run.memory_context,
                    recent_decisions: &recent_decisions,
                },
            );
            tokio::time::timeout(timeout, step).await
        };

        match outcome {
            Err(_) => {
                run.record_error(role.as_str(), format!("step timed out after {timeout:?}"));
                Vec::new()
            }
            Ok(Err(e)) => {
                run.record_error(role.as_str(), e.to_string());
                Vec::new()
            }
            Ok(Ok(output)) => {
                run.metrics.provider_calls += 1;
                run.push_message(role.as_str(), output.message);

                // Only registered roles may be routed to; unknown proposals
                // are recorded, not guessed at.
                let mut proposals = Vec::new();
                for proposed in output.proposed_next {
                    if self.registry.contains(&proposed) {
                        proposals.push(proposed);
                    } else {
                        run.record_error(
                            role.as_str(),
                            format!("proposed unknown worker '{proposed}'"),
                        );
                    }
                }
                debug!(run_id = %run.id, worker = %role, proposals = proposals.len(), "step complete");
                proposals
            }
        }
    }
}
