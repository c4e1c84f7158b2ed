// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Engine error taxonomy.
//!
//! Configuration failures are fatal at startup. Provider and store failures
//! are recoverable and retried where they occur; they surface to synchronous
//! callers as typed errors — the engine never fabricates a decision when a
//! dependency is down. Lookup misses are non-fatal. Invariant violations are
//! contained and logged so a run can never hang on one.

use atrium_memory::{DecisionId, MemoryError};

use crate::domain::provider::ProviderError;
use crate::domain::worker::WorkerRole;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Missing or invalid startup configuration. Fail fast.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Reasoning or embedding call failed or timed out.
    #[error("reasoning provider unavailable: {0}")]
    ProviderUnavailable(#[from] ProviderError),

    /// Durable store failure; retryable.
    #[error("memory store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("worker role '{0}' is not registered")]
    WorkerNotFound(WorkerRole),

    #[error("decision {0} not found")]
    DecisionNotFound(DecisionId),

    #[error("decision {0} already has a recorded outcome")]
    OutcomeAlreadyReported(DecisionId),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::StoreUnavailable(_) | EngineError::ProviderUnavailable(_)
        )
    }
}

impl From<MemoryError> for EngineError {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::StoreUnavailable(msg) => EngineError::StoreUnavailable(msg),
            MemoryError::DecisionNotFound(id) => EngineError::DecisionNotFound(id),
            MemoryError::OutcomeAlreadyReported(e) => EngineError::OutcomeAlreadyReported(e.id),
            other => EngineError::InvariantViolation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_retryable() {
        assert!(EngineError::StoreUnavailable("connection reset".into()).is_retryable());
        assert!(!EngineError::Configuration("missing endpoint".into()).is_retryable());
    }

    #[test]
    fn memory_errors_map_to_engine_variants() {
        let id = DecisionId::new();
        let mapped: EngineError = MemoryError::DecisionNotFound(id).into();
        assert!(matches!(mapped, EngineError::DecisionNotFound(d) if d == id));
    }
}
