// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Synchronous core API facade.
//!
//! One `EngineService` is constructed at process start and handed to the
//! surrounding application; everything it needs arrives through its
//! constructor. The HTTP/CLI layer out of scope here maps 1:1 onto these
//! methods.

use std::sync::Arc;

use atrium_memory::{DecisionId, DecisionRecord, MemoryQuery, MemoryRecord, MemoryStore};
use tokio_util::sync::CancellationToken;

use crate::application::decision::DecisionEngine;
use crate::application::registry::WorkerRegistry;
use crate::application::router::Router;
use crate::application::scheduler::{CognitionScheduler, SchedulerHandle};
use crate::config::EngineConfig;
use crate::domain::run::RunReport;
use crate::error::EngineError;

pub struct EngineService {
    config: Arc<EngineConfig>,
    store: Arc<dyn MemoryStore>,
    router: Router,
    decisions: DecisionEngine,
}

impl EngineService {
    pub fn new(
        config: EngineConfig,
        registry: Arc<WorkerRegistry>,
        store: Arc<dyn MemoryStore>,
    ) -> Self {
        let config = Arc::new(config);
        let router = Router::new(registry, store.clone(), config.clone());
        let decisions = DecisionEngine::new(store.clone(), config.weights.clone());
        Self { config, store, router, decisions }
    }

    /// Execute one run from Entry to Terminal. Always yields a report.
    pub async fn submit_run(&self, initial_message: &str) -> RunReport {
        self.router.submit_run(initial_message).await
    }

    /// As [`submit_run`](Self::submit_run), cancellable at step boundaries.
    pub async fn submit_run_with_cancellation(
        &self,
        initial_message: &str,
        cancel: CancellationToken,
    ) -> RunReport {
        self.router.submit_run_with_cancellation(initial_message, cancel).await
    }

    pub async fn query_memory(&self, query: &MemoryQuery) -> Result<Vec<MemoryRecord>, EngineError> {
        Ok(self.store.query(query).await?)
    }

    pub async fn make_decision(
        &self,
        decision_type: &str,
        context: serde_json::Value,
        options: &[String],
    ) -> Result<DecisionRecord, EngineError> {
        self.decisions.make_decision(decision_type, context, options).await
    }

    pub async fn report_outcome(
        &self,
        id: DecisionId,
        outcome: &str,
        success: bool,
    ) -> Result<DecisionRecord, EngineError> {
        self.decisions.report_outcome(id, outcome, success).await
    }

    /// Start the background cognition cycles against this service's store.
    pub fn start_cognition(&self) -> SchedulerHandle {
        CognitionScheduler::new(self.store.clone(), self.config.scheduler.clone()).start()
    }

    pub fn store(&self) -> Arc<dyn MemoryStore> {
        self.store.clone()
    }
}
