// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Mined decision patterns.
//!
//! Patterns are aggregates produced only by the pattern-mining cycle; nothing
//! creates them synchronously on the decision path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decision::DecisionId;
use super::ema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Success,
    Failure,
    DecisionStat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// Stable name, e.g. `decision-stat:pricing`. Upsert key.
    pub name: String,
    pub kind: PatternKind,
    pub contributing: Vec<DecisionId>,
    pub occurrences: u64,
    pub success_rate: f64,
    pub last_seen: DateTime<Utc>,
}

impl Pattern {
    pub fn new(name: impl Into<String>, kind: PatternKind, success_rate: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            contributing: Vec::new(),
            occurrences: 1,
            success_rate: success_rate.clamp(0.0, 1.0),
            last_seen: Utc::now(),
        }
    }

    /// Fold a fresh observation into the aggregate; the success rate is a
    /// rolling average so a single bad day does not erase history.
    pub fn observe(&mut self, sample_rate: f64, contributing: &[DecisionId]) {
        self.success_rate = ema(self.success_rate, sample_rate.clamp(0.0, 1.0));
        self.occurrences += 1;
        for id in contributing {
            if !self.contributing.contains(id) {
                self.contributing.push(*id);
            }
        }
        self.last_seen = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_moves_rate_slowly() {
        let mut p = Pattern::new("decision-stat:pricing", PatternKind::DecisionStat, 1.0);
        p.observe(0.0, &[]);
        assert!((p.success_rate - 0.9).abs() < 1e-9);
        assert_eq!(p.occurrences, 2);
    }

    #[test]
    fn observe_deduplicates_contributing_decisions() {
        let id = DecisionId::new();
        let mut p = Pattern::new("n", PatternKind::Success, 0.5);
        p.observe(1.0, &[id]);
        p.observe(1.0, &[id]);
        assert_eq!(p.contributing.len(), 1);
    }
}
