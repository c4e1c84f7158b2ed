// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0

pub mod record;
pub mod decision;
pub mod pattern;
pub mod objective;
pub mod events;

pub use record::{DecayDisposition, MemoryId, MemoryRecord, GLOBAL_OWNER};
pub use decision::{DecisionId, DecisionRecord, OutcomeError};
pub use pattern::{Pattern, PatternKind};
pub use objective::{ObjectiveId, LearningObjective};
pub use events::{MemoryEvent, EventSink, NullEventSink};

/// Exponential moving average used for every rolling rate in the store.
pub fn ema(old: f64, sample: f64) -> f64 {
    0.9 * old + 0.1 * sample
}

/// Cosine similarity between two embedding vectors.
///
/// Returns 0.0 when either vector is a zero sentinel or dimensions differ,
/// so unembedded records never rank by similarity.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_weights_old_value() {
        let updated = ema(1.0, 0.0);
        assert!((updated - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.5, 0.3, 0.2];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_of_zero_sentinel_is_zero() {
        let zero = vec![0.0; 3];
        let v = vec![0.5, 0.3, 0.2];
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
    }

    #[test]
    fn cosine_dimension_mismatch_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }
}
