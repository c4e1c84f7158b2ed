// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Multi-worker orchestration engine for the Atrium backend.
//!
//! Routes a run across specialized workers through a shared [`RunState`],
//! scores choices against the associative memory store, and keeps that store
//! alive with supervised background cognition cycles.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Worker registry, router, decision engine, cognition
//!   scheduler and the synchronous core API facade

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod config;
pub mod error;

pub use domain::*;
pub use application::*;
pub use config::{DecisionWeights, EngineConfig, SchedulerConfig};
pub use error::EngineError;
pub use infrastructure::HttpReasoningProvider;
