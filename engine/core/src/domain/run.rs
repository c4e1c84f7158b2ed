// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Run state threaded through the orchestration graph.
//!
//! Owned exclusively by its run: one worker step mutates it at a time.
//! Message, decision and error lists are append-only; the pending queue and
//! memory context are working state the router manages.

use std::collections::VecDeque;

use atrium_memory::{DecisionId, MemoryRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::worker::WorkerRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMessage {
    /// Role id of the producing worker, or `"user"` for the initial message.
    pub worker: String,
    pub content: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunError {
    pub worker: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunMetrics {
    pub steps: u32,
    pub provider_calls: u32,
    pub decisions: u32,
    pub errors: u32,
}

pub struct RunState {
    pub id: RunId,
    messages: Vec<RunMessage>,
    /// Workers queued by earlier routing suggestions, earliest first.
    pub pending: VecDeque<WorkerRole>,
    /// Snapshot of relevant memories taken before the current step. May go
    /// stale under concurrent decay; that is tolerated by contract.
    pub memory_context: Vec<MemoryRecord>,
    decisions: Vec<DecisionId>,
    errors: Vec<RunError>,
    pub metrics: RunMetrics,
    pub created_at: DateTime<Utc>,
}

impl RunState {
    pub fn new(initial_message: impl Into<String>) -> Self {
        let mut state = Self {
            id: RunId::new(),
            messages: Vec::new(),
            pending: VecDeque::new(),
            memory_context: Vec::new(),
            decisions: Vec::new(),
            errors: Vec::new(),
            metrics: RunMetrics::default(),
            created_at: Utc::now(),
        };
        state.push_message("user", initial_message);
        state
    }

    pub fn push_message(&mut self, worker: impl Into<String>, content: impl Into<String>) {
        self.messages.push(RunMessage {
            worker: worker.into(),
            content: content.into(),
            at: Utc::now(),
        });
    }

    pub fn record_error(&mut self, worker: impl Into<String>, message: impl Into<String>) {
        self.metrics.errors += 1;
        self.errors.push(RunError {
            worker: worker.into(),
            message: message.into(),
            at: Utc::now(),
        });
    }

    pub fn record_decision(&mut self, id: DecisionId) {
        self.metrics.decisions += 1;
        self.decisions.push(id);
    }

    pub fn messages(&self) -> &[RunMessage] {
        &self.messages
    }

    /// The most recent `limit` messages, oldest first.
    pub fn recent_messages(&self, limit: usize) -> &[RunMessage] {
        let start = self.messages.len().saturating_sub(limit);
        &self.messages[start..]
    }

    pub fn errors(&self) -> &[RunError] {
        &self.errors
    }

    pub fn decisions(&self) -> &[DecisionId] {
        &self.decisions
    }

    pub fn final_message(&self) -> Option<&str> {
        self.messages.last().map(|m| m.content.as_str())
    }

    /// Collapse into the report handed back to the caller.
    pub fn into_report(self) -> RunReport {
        RunReport {
            run_id: self.id,
            final_message: self.messages.last().map(|m| m.content.clone()),
            decisions: self.decisions,
            errors: self.errors,
            metrics: self.metrics,
        }
    }
}

/// Result object of `submit_run`. Always returned, however the run ended;
/// partial progress is carried in `decisions` and `errors`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub decisions: Vec<DecisionId>,
    pub metrics: RunMetrics,
    pub errors: Vec<RunError>,
    pub final_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_message_is_first_and_final_until_workers_speak() {
        let mut run = RunState::new("customer asked for a quote");
        assert_eq!(run.final_message(), Some("customer asked for a quote"));

        run.push_message("pricing", "quoted 1200");
        assert_eq!(run.final_message(), Some("quoted 1200"));
        assert_eq!(run.messages().len(), 2);
    }

    #[test]
    fn errors_bump_the_metric_counter() {
        let mut run = RunState::new("x");
        run.record_error("scheduling", "timeout");
        assert_eq!(run.metrics.errors, 1);
        assert_eq!(run.errors().len(), 1);
        assert_eq!(run.errors()[0].worker, "scheduling");
    }

    #[test]
    fn report_carries_partial_progress() {
        let mut run = RunState::new("x");
        let id = DecisionId::new();
        run.record_decision(id);
        run.record_error("w", "boom");

        let report = run.into_report();
        assert_eq!(report.decisions, vec![id]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.final_message.as_deref(), Some("x"));
    }

    #[test]
    fn recent_messages_returns_the_tail() {
        let mut run = RunState::new("first");
        run.push_message("a", "second");
        run.push_message("b", "third");
        let tail = run.recent_messages(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content, "second");
    }
}
