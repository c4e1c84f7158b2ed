// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Learning objectives advanced by the knowledge-synthesis cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectiveId(pub Uuid);

impl ObjectiveId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectiveId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningObjective {
    pub id: ObjectiveId,
    pub topic: String,
    /// Current synthesized knowledge for the topic.
    pub knowledge: String,
    /// Monotonically non-decreasing, in [0,1].
    progress: f64,
    pub priority: f64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LearningObjective {
    pub fn new(topic: impl Into<String>, priority: f64) -> Self {
        Self {
            id: ObjectiveId::new(),
            topic: topic.into(),
            knowledge: String::new(),
            progress: 0.0,
            priority,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_open(&self) -> bool {
        self.completed_at.is_none()
    }

    /// Advance progress, never regressing. Completion is stamped the first
    /// time progress reaches 1.0.
    pub fn advance(&mut self, progress: f64, knowledge: impl Into<String>) {
        let clamped = progress.clamp(0.0, 1.0);
        if clamped > self.progress {
            self.progress = clamped;
        }
        self.knowledge = knowledge.into();
        if self.progress >= 1.0 && self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_never_regresses() {
        let mut o = LearningObjective::new("late invoices", 0.8);
        o.advance(0.4, "partial");
        o.advance(0.2, "worse evidence");
        assert_eq!(o.progress(), 0.4);
        // Knowledge may still be refreshed by a weaker pass.
        assert_eq!(o.knowledge, "worse evidence");
    }

    #[test]
    fn completion_stamped_once_at_full_progress() {
        let mut o = LearningObjective::new("vendor churn", 0.5);
        o.advance(1.0, "done");
        let first = o.completed_at.unwrap();
        o.advance(1.0, "done again");
        assert_eq!(o.completed_at.unwrap(), first);
        assert!(!o.is_open());
    }
}
