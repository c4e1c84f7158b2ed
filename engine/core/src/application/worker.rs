// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Worker step execution.
//!
//! The default handler assembles a prompt from the role description,
//! capability tags, recent run history, retrieved memories and recent
//! decisions, then calls the reasoning provider and maps its contracted
//! reply onto a step output.

use std::sync::Arc;

use async_trait::async_trait;
use atrium_memory::{DecisionRecord, MemoryRecord};

use crate::domain::provider::{GenerationRequest, ReasoningProvider};
use crate::domain::run::RunState;
use crate::domain::worker::{WorkerDescriptor, WorkerRole, WorkerStepOutput};
use crate::error::EngineError;

/// Read-only view of the run handed to a worker step.
pub struct StepContext<'a> {
    pub run: &'a RunState,
    pub memories: &'a [MemoryRecord],
    pub recent_decisions: &'a [DecisionRecord],
}

/// One worker step. Implementations must be cancel-safe at the await points;
/// the router may time the whole step out.
#[async_trait]
pub trait WorkerHandler: Send + Sync {
    async fn step(
        &self,
        descriptor: &WorkerDescriptor,
        ctx: StepContext<'_>,
    ) -> Result<WorkerStepOutput, EngineError>;
}

/// Default handler: one reasoning-provider call per step.
pub struct ProviderWorker {
    provider: Arc<dyn ReasoningProvider>,
    history_limit: usize,
}

impl ProviderWorker {
    pub fn new(provider: Arc<dyn ReasoningProvider>) -> Self {
        Self { provider, history_limit: 8 }
    }

    fn build_prompt(descriptor: &WorkerDescriptor, ctx: &StepContext<'_>, history_limit: usize) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "You are the `{}` worker: {}\n",
            descriptor.role, descriptor.description
        ));
        if !descriptor.capabilities.is_empty() {
            prompt.push_str(&format!("Capabilities: {}\n", descriptor.capabilities.join(", ")));
        }
        if !descriptor.tools.is_empty() {
            prompt.push_str(&format!("Tools: {}\n", descriptor.tools.join(", ")));
        }

        prompt.push_str("\nConversation so far:\n");
        for message in ctx.run.recent_messages(history_limit) {
            prompt.push_str(&format!("[{}] {}\n", message.worker, message.content));
        }

        if !ctx.memories.is_empty() {
            prompt.push_str("\nRelevant memories:\n");
            for memory in ctx.memories {
                prompt.push_str(&format!(
                    "- ({:.2}) {}\n",
                    memory.importance(),
                    memory.content
                ));
            }
        }

        if !ctx.recent_decisions.is_empty() {
            prompt.push_str("\nRecent decisions:\n");
            for decision in ctx.recent_decisions {
                prompt.push_str(&format!(
                    "- {}: chose `{}` (confidence {:.2})\n",
                    decision.decision_type, decision.chosen_option, decision.confidence
                ));
            }
        }

        prompt.push_str(
            "\nRespond with a JSON object: {\"text\": ..., \"action_taken\": ..., \
             \"proposed_next_workers\": [...], \"confidence\": ...}\n",
        );
        prompt
    }
}

#[async_trait]
impl WorkerHandler for ProviderWorker {
    async fn step(
        &self,
        descriptor: &WorkerDescriptor,
        ctx: StepContext<'_>,
    ) -> Result<WorkerStepOutput, EngineError> {
        let request = GenerationRequest {
            prompt: Self::build_prompt(descriptor, &ctx, self.history_limit),
            profile: descriptor.profile.clone(),
        };

        let reply = self.provider.generate(&request).await?;

        Ok(WorkerStepOutput {
            message: reply.text,
            action_taken: reply.action_taken,
            proposed_next: reply
                .proposed_next_workers
                .into_iter()
                .map(WorkerRole::new)
                .collect(),
            confidence: reply.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::provider::{ProviderError, WorkerReply};
    use parking_lot::Mutex;

    struct CannedProvider {
        prompts: Mutex<Vec<String>>,
        reply: WorkerReply,
    }

    impl CannedProvider {
        fn new(reply: WorkerReply) -> Self {
            Self { prompts: Mutex::new(Vec::new()), reply }
        }
    }

    #[async_trait]
    impl ReasoningProvider for CannedProvider {
        async fn generate(&self, request: &GenerationRequest) -> Result<WorkerReply, ProviderError> {
            self.prompts.lock().push(request.prompt.clone());
            Ok(self.reply.clone())
        }

        async fn health_check(&self) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn prompt_carries_role_history_and_reply_maps_to_output() {
        let provider = Arc::new(CannedProvider::new(WorkerReply {
            text: "crew 4 booked for Tuesday".into(),
            action_taken: Some("schedule".into()),
            proposed_next_workers: vec!["invoicing".into()],
            confidence: Some(0.9),
        }));
        let handler = ProviderWorker::new(provider.clone());

        let descriptor = WorkerDescriptor::new(
            WorkerRole::new("scheduling"),
            "assigns field crews",
            vec!["calendar".into()],
        );
        let run = RunState::new("book a crew for the Hansen job");
        let output = handler
            .step(&descriptor, StepContext { run: &run, memories: &[], recent_decisions: &[] })
            .await
            .unwrap();

        assert_eq!(output.message, "crew 4 booked for Tuesday");
        assert_eq!(output.proposed_next, vec![WorkerRole::new("invoicing")]);

        let prompts = provider.prompts.lock();
        assert!(prompts[0].contains("`scheduling` worker"));
        assert!(prompts[0].contains("Hansen job"));
        assert!(prompts[0].contains("calendar"));
    }

    #[tokio::test]
    async fn provider_failure_propagates_as_engine_error() {
        struct DownProvider;

        #[async_trait]
        impl ReasoningProvider for DownProvider {
            async fn generate(
                &self,
                _request: &GenerationRequest,
            ) -> Result<WorkerReply, ProviderError> {
                Err(ProviderError::Network("connection refused".into()))
            }

            async fn health_check(&self) -> Result<(), ProviderError> {
                Err(ProviderError::Network("connection refused".into()))
            }
        }

        let handler = ProviderWorker::new(Arc::new(DownProvider));
        let descriptor = WorkerDescriptor::new(WorkerRole::new("scheduling"), "d", vec![]);
        let run = RunState::new("x");
        let err = handler
            .step(&descriptor, StepContext { run: &run, memories: &[], recent_decisions: &[] })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ProviderUnavailable(_)));
    }
}
