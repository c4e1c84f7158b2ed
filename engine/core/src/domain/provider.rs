// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Reasoning provider boundary.
//!
//! Anti-corruption layer over the external text-generation capability.
//! Replies are contracted: a [`WorkerReply`] must deserialize strictly, and
//! anything else is a malformed reply the router treats as a failed step —
//! routing never guesses at free text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::worker::ProviderProfile;

/// Prompt plus the worker's provider profile.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub profile: ProviderProfile,
}

/// Contracted reply schema. Unknown fields are rejected so drifting provider
/// output surfaces as an error instead of silently mis-routing a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerReply {
    pub text: String,

    #[serde(default)]
    pub action_taken: Option<String>,

    /// Ordered role ids the worker wants to run next.
    #[serde(default)]
    pub proposed_next_workers: Vec<String>,

    #[serde(default)]
    pub confidence: Option<f64>,
}

impl WorkerReply {
    /// Parse and validate a raw provider payload.
    pub fn parse(raw: &str) -> Result<Self, ProviderError> {
        let reply: WorkerReply = serde_json::from_str(raw)
            .map_err(|e| ProviderError::MalformedReply(e.to_string()))?;
        if let Some(confidence) = reply.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(ProviderError::MalformedReply(format!(
                    "confidence {confidence} outside [0,1]"
                )));
            }
        }
        Ok(reply)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("reply violated the response schema: {0}")]
    MalformedReply(String),

    #[error("provider error: {0}")]
    Provider(String),
}

/// External reasoning capability bound to each worker step.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<WorkerReply, ProviderError>;

    async fn health_check(&self) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_reply_parses() {
        let reply = WorkerReply::parse(
            r#"{"text":"booked crew 4","action_taken":"schedule","proposed_next_workers":["invoicing"],"confidence":0.8}"#,
        )
        .unwrap();
        assert_eq!(reply.proposed_next_workers, vec!["invoicing"]);
        assert_eq!(reply.confidence, Some(0.8));
    }

    #[test]
    fn optional_fields_default() {
        let reply = WorkerReply::parse(r#"{"text":"done"}"#).unwrap();
        assert!(reply.proposed_next_workers.is_empty());
        assert!(reply.action_taken.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = WorkerReply::parse(r#"{"text":"ok","next":"invoicing"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedReply(_)));
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let err = WorkerReply::parse(r#"{"text":"ok","confidence":1.5}"#).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedReply(_)));
    }

    #[test]
    fn free_text_is_rejected() {
        let err = WorkerReply::parse("I think we should call invoicing next").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedReply(_)));
    }
}
