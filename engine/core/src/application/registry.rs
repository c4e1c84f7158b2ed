// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Worker registry.
//!
//! Static catalog of worker roles: built once at startup, frozen for the
//! process lifetime. Each role maps to its descriptor and an explicit
//! handler object — behavior is bound at registration, never captured from
//! enclosing scope.

use std::collections::HashMap;
use std::sync::Arc;

use crate::application::worker::WorkerHandler;
use crate::domain::worker::{WorkerDescriptor, WorkerRole};
use crate::error::EngineError;

#[derive(Clone)]
pub struct Registration {
    pub descriptor: Arc<WorkerDescriptor>,
    pub handler: Arc<dyn WorkerHandler>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").finish_non_exhaustive()
    }
}

/// Mutable collection phase of the registry.
#[derive(Default)]
pub struct RegistryBuilder {
    workers: HashMap<WorkerRole, Registration>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a role. Registering the same role twice replaces the earlier
    /// entry; the last registration wins.
    pub fn register(mut self, descriptor: WorkerDescriptor, handler: Arc<dyn WorkerHandler>) -> Self {
        let role = descriptor.role.clone();
        self.workers.insert(
            role,
            Registration { descriptor: Arc::new(descriptor), handler },
        );
        self
    }

    pub fn build(self) -> WorkerRegistry {
        WorkerRegistry { workers: self.workers }
    }
}

/// Frozen role catalog.
pub struct WorkerRegistry {
    workers: HashMap<WorkerRole, Registration>,
}

impl WorkerRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn get(&self, role: &WorkerRole) -> Result<&Registration, EngineError> {
        self.workers
            .get(role)
            .ok_or_else(|| EngineError::WorkerNotFound(role.clone()))
    }

    pub fn descriptor(&self, role: &WorkerRole) -> Result<Arc<WorkerDescriptor>, EngineError> {
        Ok(self.get(role)?.descriptor.clone())
    }

    pub fn contains(&self, role: &WorkerRole) -> bool {
        self.workers.contains_key(role)
    }

    pub fn roles(&self) -> Vec<WorkerRole> {
        self.workers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::worker::StepContext;
    use crate::domain::worker::WorkerStepOutput;
    use async_trait::async_trait;

    struct NoopHandler;

    #[async_trait]
    impl WorkerHandler for NoopHandler {
        async fn step(
            &self,
            _descriptor: &WorkerDescriptor,
            _ctx: StepContext<'_>,
        ) -> Result<WorkerStepOutput, EngineError> {
            Ok(WorkerStepOutput::default())
        }
    }

    #[test]
    fn lookup_of_registered_role_succeeds() {
        let registry = WorkerRegistry::builder()
            .register(
                WorkerDescriptor::new(WorkerRole::new("scheduling"), "schedules crews", vec![]),
                Arc::new(NoopHandler),
            )
            .build();

        assert!(registry.contains(&WorkerRole::new("scheduling")));
        let descriptor = registry.descriptor(&WorkerRole::new("scheduling")).unwrap();
        assert_eq!(descriptor.description, "schedules crews");
    }

    #[test]
    fn unknown_role_is_a_typed_miss() {
        let registry = WorkerRegistry::builder().build();
        let err = registry.get(&WorkerRole::new("ghost")).unwrap_err();
        assert!(matches!(err, EngineError::WorkerNotFound(_)));
    }
}
