// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Memory records: the unit of knowledge held by the associative store.
//!
//! Importance stays inside [0,1] at every write. A record whose importance
//! falls below the prune threshold during a decay pass is deleted for good.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owner id used for records not attributed to a specific worker.
pub const GLOBAL_OWNER: &str = "global";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryId(pub Uuid);

impl MemoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MemoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What a decay pass decided for a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayDisposition {
    /// Fresh or important enough; left untouched.
    Untouched,
    /// Importance multiplied by the decay constant.
    Decayed,
    /// Importance fell below the prune threshold; delete permanently.
    Prune,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: MemoryId,
    /// Worker role id, or [`GLOBAL_OWNER`].
    pub owner: String,
    pub category: String,
    /// Opaque payload; the store never interprets it.
    pub content: serde_json::Value,
    pub embedding: Vec<f32>,
    /// True when the embedding is a zero sentinel because the provider failed.
    pub unembedded: bool,
    importance: f64,
    pub confidence: f64,
    pub access_count: u64,
    pub decay_factor: f64,
    /// Decay applications since the last access. Reset on access so each
    /// staleness period decays a record at most once.
    decay_epochs: u64,
    pub reinforcement_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(
        owner: impl Into<String>,
        category: impl Into<String>,
        content: serde_json::Value,
        embedding: Vec<f32>,
        importance: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: MemoryId::new(),
            owner: owner.into(),
            category: category.into(),
            content,
            embedding,
            unembedded: false,
            importance: importance.clamp(0.0, 1.0),
            confidence: 0.5,
            access_count: 0,
            decay_factor: 1.0,
            decay_epochs: 0,
            reinforcement_count: 0,
            created_at: now,
            last_accessed: now,
            last_modified: now,
        }
    }

    /// Mark the record as carrying a sentinel embedding.
    pub fn with_sentinel_embedding(mut self, dimension: usize) -> Self {
        self.embedding = vec![0.0; dimension];
        self.unembedded = true;
        self
    }

    pub fn importance(&self) -> f64 {
        self.importance
    }

    /// Every write path goes through here so the [0,1] invariant holds.
    pub fn set_importance(&mut self, value: f64) {
        self.importance = value.clamp(0.0, 1.0);
        self.last_modified = Utc::now();
    }

    /// `importance = min(1.0, importance + delta)`, bump reinforcement count.
    pub fn reinforce(&mut self, delta: f64) {
        self.set_importance(self.importance + delta.max(0.0));
        self.reinforcement_count += 1;
    }

    /// Record a retrieval: access_count and last_accessed move together, and
    /// the decay clock restarts.
    pub fn record_access(&mut self, at: DateTime<Utc>) {
        self.access_count += 1;
        self.last_accessed = at;
        self.decay_epochs = 0;
    }

    pub fn is_stale(&self, horizon: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_accessed > horizon
    }

    /// Apply one decay-pass evaluation.
    ///
    /// A stale record decays once per whole staleness period elapsed since
    /// its last access; `decay_epochs` tracks how many of those periods have
    /// already been applied, so repeated passes with no intervening access
    /// change nothing after the first.
    pub fn evaluate_decay(
        &mut self,
        horizon: Duration,
        ceiling: f64,
        decay_constant: f64,
        prune_threshold: f64,
        now: DateTime<Utc>,
    ) -> DecayDisposition {
        if !self.is_stale(horizon, now) || self.importance >= ceiling {
            return DecayDisposition::Untouched;
        }
        let periods = ((now - self.last_accessed).num_seconds() / horizon.num_seconds()) as u64;
        if self.decay_epochs >= periods {
            return DecayDisposition::Untouched;
        }
        let steps = (periods - self.decay_epochs).min(i32::MAX as u64) as i32;
        let factor = decay_constant.powi(steps);
        let decayed = self.importance * factor;
        if decayed < prune_threshold {
            return DecayDisposition::Prune;
        }
        self.set_importance(decayed);
        self.decay_factor *= factor;
        self.decay_epochs = periods;
        DecayDisposition::Decayed
    }

    /// Fold a near-duplicate into this record: max importance, summed
    /// reinforcement and access counts, newest access timestamp.
    pub fn absorb(&mut self, other: &MemoryRecord) {
        self.set_importance(self.importance.max(other.importance));
        self.reinforcement_count += other.reinforcement_count;
        self.access_count += other.access_count;
        if other.last_accessed > self.last_accessed {
            self.last_accessed = other.last_accessed;
        }
        self.confidence = self.confidence.max(other.confidence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(importance: f64) -> MemoryRecord {
        MemoryRecord::new(GLOBAL_OWNER, "note", json!({"text": "x"}), vec![1.0, 0.0], importance)
    }

    #[test]
    fn importance_is_clamped_on_construction_and_writes() {
        let mut r = record(1.7);
        assert_eq!(r.importance(), 1.0);
        r.set_importance(-0.3);
        assert_eq!(r.importance(), 0.0);
    }

    #[test]
    fn reinforce_caps_at_one() {
        let mut r = record(0.9);
        for _ in 0..20 {
            r.reinforce(0.3);
        }
        assert_eq!(r.importance(), 1.0);
        assert_eq!(r.reinforcement_count, 20);
    }

    #[test]
    fn fresh_record_does_not_decay() {
        let mut r = record(0.2);
        let d = r.evaluate_decay(Duration::days(7), 0.6, 0.85, 0.1, Utc::now());
        assert_eq!(d, DecayDisposition::Untouched);
        assert_eq!(r.importance(), 0.2);
    }

    #[test]
    fn stale_low_importance_record_decays() {
        let mut r = record(0.4);
        r.last_accessed = Utc::now() - Duration::days(10);
        let d = r.evaluate_decay(Duration::days(7), 0.6, 0.85, 0.1, Utc::now());
        assert_eq!(d, DecayDisposition::Decayed);
        assert!((r.importance() - 0.34).abs() < 1e-9);
    }

    #[test]
    fn record_above_ceiling_is_untouched() {
        let mut r = record(0.9);
        r.last_accessed = Utc::now() - Duration::days(30);
        let d = r.evaluate_decay(Duration::days(7), 0.6, 0.85, 0.1, Utc::now());
        assert_eq!(d, DecayDisposition::Untouched);
    }

    #[test]
    fn second_evaluation_without_access_is_a_no_op() {
        let mut r = record(0.4);
        r.last_accessed = Utc::now() - Duration::days(10);
        let first = r.evaluate_decay(Duration::days(7), 0.6, 0.85, 0.1, Utc::now());
        assert_eq!(first, DecayDisposition::Decayed);
        let after_first = r.importance();

        let second = r.evaluate_decay(Duration::days(7), 0.6, 0.85, 0.1, Utc::now());
        assert_eq!(second, DecayDisposition::Untouched);
        assert_eq!(r.importance(), after_first);
    }

    #[test]
    fn access_restarts_the_decay_clock() {
        let mut r = record(0.4);
        r.last_accessed = Utc::now() - Duration::days(10);
        r.evaluate_decay(Duration::days(7), 0.6, 0.85, 0.1, Utc::now());

        r.record_access(Utc::now());
        let d = r.evaluate_decay(Duration::days(7), 0.6, 0.85, 0.1, Utc::now());
        assert_eq!(d, DecayDisposition::Untouched);
    }

    #[test]
    fn decay_below_prune_threshold_requests_deletion() {
        let mut r = record(0.05);
        r.last_accessed = Utc::now() - Duration::days(10);
        let d = r.evaluate_decay(Duration::days(7), 0.6, 0.85, 0.1, Utc::now());
        assert_eq!(d, DecayDisposition::Prune);
    }

    #[test]
    fn absorb_keeps_max_importance_and_sums_counts() {
        let mut a = record(0.4);
        let mut b = record(0.7);
        a.reinforcement_count = 3;
        b.reinforcement_count = 5;
        b.access_count = 2;
        a.absorb(&b);
        assert_eq!(a.importance(), 0.7);
        assert_eq!(a.reinforcement_count, 8);
        assert_eq!(a.access_count, 2);
    }
}
