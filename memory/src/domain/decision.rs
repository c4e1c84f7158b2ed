// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Auditable decision records.
//!
//! A decision is written once at decision time; its outcome may be reported
//! exactly once afterwards. A second report is rejected so the audit trail
//! can never be rewritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecisionId(pub Uuid);

impl DecisionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DecisionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DecisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Raised when an outcome is reported for an already-resolved decision.
#[derive(Debug, thiserror::Error)]
#[error("decision {id} already has an outcome recorded at {resolved_at}")]
pub struct OutcomeError {
    pub id: DecisionId,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: DecisionId,
    pub decision_type: String,
    pub input_context: serde_json::Value,
    pub candidate_options: Vec<String>,
    pub chosen_option: String,
    pub confidence: f64,
    pub outcome: Option<String>,
    /// None until an outcome is reported.
    pub success: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl DecisionRecord {
    pub fn new(
        decision_type: impl Into<String>,
        input_context: serde_json::Value,
        candidate_options: Vec<String>,
        chosen_option: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            id: DecisionId::new(),
            decision_type: decision_type.into(),
            input_context,
            candidate_options,
            chosen_option: chosen_option.into(),
            confidence: confidence.clamp(0.0, 1.0),
            outcome: None,
            success: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    /// Record the outcome. Exactly once; a second call is rejected.
    pub fn resolve(&mut self, outcome: impl Into<String>, success: bool) -> Result<(), OutcomeError> {
        if let Some(resolved_at) = self.resolved_at {
            return Err(OutcomeError { id: self.id, resolved_at });
        }
        self.outcome = Some(outcome.into());
        self.success = Some(success);
        self.resolved_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decision() -> DecisionRecord {
        DecisionRecord::new(
            "pricing",
            json!({"customer": "acme"}),
            vec!["A".into(), "B".into()],
            "A",
            0.5,
        )
    }

    #[test]
    fn outcome_resolves_exactly_once() {
        let mut d = decision();
        assert!(!d.is_resolved());
        d.resolve("accepted", true).unwrap();
        assert_eq!(d.success, Some(true));

        let err = d.resolve("rejected", false).unwrap_err();
        assert_eq!(err.id, d.id);
        // First outcome untouched.
        assert_eq!(d.outcome.as_deref(), Some("accepted"));
        assert_eq!(d.success, Some(true));
    }

    #[test]
    fn confidence_is_clamped() {
        let d = DecisionRecord::new("t", json!({}), vec!["x".into()], "x", 1.4);
        assert_eq!(d.confidence, 1.0);
    }
}
