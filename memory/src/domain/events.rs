// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Domain events emitted by the memory store.
//!
//! The store publishes to an [`EventSink`] so observers (metrics, audit log,
//! future event bus) stay decoupled from the write path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decision::DecisionId;
use super::record::MemoryId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemoryEvent {
    RecordStored {
        id: MemoryId,
        owner: String,
        category: String,
        unembedded: bool,
        at: DateTime<Utc>,
    },
    RecordReinforced {
        id: MemoryId,
        delta: f64,
        importance: f64,
        at: DateTime<Utc>,
    },
    DecayCompleted {
        decayed: usize,
        pruned: usize,
        at: DateTime<Utc>,
    },
    ConsolidationCompleted {
        merged: usize,
        at: DateTime<Utc>,
    },
    DecisionRecorded {
        id: DecisionId,
        decision_type: String,
        at: DateTime<Utc>,
    },
    DecisionResolved {
        id: DecisionId,
        success: bool,
        at: DateTime<Utc>,
    },
    PatternUpserted {
        name: String,
        occurrences: u64,
        success_rate: f64,
        at: DateTime<Utc>,
    },
    ObjectiveAdvanced {
        topic: String,
        progress: f64,
        completed: bool,
        at: DateTime<Utc>,
    },
}

impl MemoryEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            MemoryEvent::RecordStored { .. } => "record_stored",
            MemoryEvent::RecordReinforced { .. } => "record_reinforced",
            MemoryEvent::DecayCompleted { .. } => "decay_completed",
            MemoryEvent::ConsolidationCompleted { .. } => "consolidation_completed",
            MemoryEvent::DecisionRecorded { .. } => "decision_recorded",
            MemoryEvent::DecisionResolved { .. } => "decision_resolved",
            MemoryEvent::PatternUpserted { .. } => "pattern_upserted",
            MemoryEvent::ObjectiveAdvanced { .. } => "objective_advanced",
        }
    }
}

/// Sink for memory domain events. Publishing must never fail the write that
/// produced the event; implementations log and swallow their own errors.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: MemoryEvent);
}

/// Default sink that drops events.
pub struct NullEventSink;

#[async_trait]
impl EventSink for NullEventSink {
    async fn publish(&self, _event: MemoryEvent) {}
}
