// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0

pub mod registry;
pub mod worker;
pub mod decision;
pub mod router;
pub mod scheduler;
pub mod service;

pub use registry::{RegistryBuilder, WorkerRegistry};
pub use worker::{ProviderWorker, StepContext, WorkerHandler};
pub use decision::DecisionEngine;
pub use router::Router;
pub use scheduler::{CognitionScheduler, SchedulerHandle};
pub use service::EngineService;
