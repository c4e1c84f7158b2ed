// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Worker roles and descriptors.
//!
//! A descriptor is built once at process start and stays immutable for the
//! process lifetime; only its scratch notes are ephemeral.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Identifier of a specialized worker role, e.g. `scheduling` or
/// `invoicing`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerRole(String);

impl WorkerRole {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerRole {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Reasoning-provider profile a worker is bound to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ProviderProfile {
    fn default() -> Self {
        Self {
            model: "atrium-worker-v2".to_string(),
            temperature: 0.3,
            max_tokens: 2048,
        }
    }
}

/// Static catalog entry for one worker role.
pub struct WorkerDescriptor {
    pub role: WorkerRole,
    pub description: String,
    pub capabilities: Vec<String>,
    pub profile: ProviderProfile,
    pub tools: Vec<String>,
    /// Ephemeral per-process notes; never persisted.
    scratch: Mutex<Vec<String>>,
}

impl WorkerDescriptor {
    pub fn new(role: WorkerRole, description: impl Into<String>, capabilities: Vec<String>) -> Self {
        Self {
            role,
            description: description.into(),
            capabilities,
            profile: ProviderProfile::default(),
            tools: Vec::new(),
            scratch: Mutex::new(Vec::new()),
        }
    }

    pub fn with_profile(mut self, profile: ProviderProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = tools;
        self
    }

    pub fn note(&self, text: impl Into<String>) {
        self.scratch.lock().push(text.into());
    }

    /// The most recent `limit` scratch notes, oldest first.
    pub fn recent_notes(&self, limit: usize) -> Vec<String> {
        let notes = self.scratch.lock();
        let start = notes.len().saturating_sub(limit);
        notes[start..].to_vec()
    }
}

/// What one worker step produced, as the router sees it.
#[derive(Debug, Clone, Default)]
pub struct WorkerStepOutput {
    pub message: String,
    pub action_taken: Option<String>,
    /// Ordered routing suggestions; first entry is executed next, the rest
    /// are queued.
    pub proposed_next: Vec<WorkerRole>,
    pub confidence: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_notes_keep_only_the_tail() {
        let descriptor =
            WorkerDescriptor::new(WorkerRole::new("scheduling"), "schedules crews", vec![]);
        for i in 0..5 {
            descriptor.note(format!("note {i}"));
        }
        let recent = descriptor.recent_notes(2);
        assert_eq!(recent, vec!["note 3".to_string(), "note 4".to_string()]);
    }

    #[test]
    fn role_round_trips_through_serde() {
        let role = WorkerRole::new("invoicing");
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, "\"invoicing\"");
        let back: WorkerRole = serde_json::from_str(&json).unwrap();
        assert_eq!(back, role);
    }
}
