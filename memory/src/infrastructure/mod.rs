// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0

pub mod repository;
pub mod in_memory;
pub mod embedding;
pub mod postgres;

pub use repository::{
    DecisionRepository, ObjectiveRepository, PatternRepository, RecordRepository,
};
pub use in_memory::{
    InMemoryDecisionRepository, InMemoryObjectiveRepository, InMemoryPatternRepository,
    InMemoryRecordRepository,
};
pub use embedding::{EmbeddingError, EmbeddingProvider, HashEmbedding, HttpEmbeddingClient};
pub use postgres::PostgresRepositories;
