// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL repositories.
//!
//! Each entity is stored as a JSONB document beside the columns the store
//! filters and orders on; the embedding lives in a `float4[]` column.
//! Similarity search fetches the SQL-filtered candidate set and ranks by
//! cosine in process, keeping the repository trait the only seam a
//! vector-native backend would need to replace.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::domain::{
    cosine_similarity, DecisionId, DecisionRecord, LearningObjective, MemoryId, MemoryRecord,
    ObjectiveId, Pattern,
};

use super::repository::{
    DecisionRepository, ObjectiveRepository, PatternRepository, RecordFilter, RecordRepository,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS memory_records (
    id            UUID PRIMARY KEY,
    owner         TEXT NOT NULL,
    category      TEXT NOT NULL,
    importance    DOUBLE PRECISION NOT NULL,
    unembedded    BOOLEAN NOT NULL,
    embedding     REAL[] NOT NULL,
    record_json   JSONB NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL,
    last_accessed TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS memory_records_owner_category
    ON memory_records (owner, category);

CREATE TABLE IF NOT EXISTS decision_records (
    id            UUID PRIMARY KEY,
    decision_type TEXT NOT NULL,
    decision_json JSONB NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS decision_records_type_created
    ON decision_records (decision_type, created_at DESC);

CREATE TABLE IF NOT EXISTS patterns (
    name         TEXT PRIMARY KEY,
    pattern_json JSONB NOT NULL,
    last_seen    TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS learning_objectives (
    id             UUID PRIMARY KEY,
    priority       DOUBLE PRECISION NOT NULL,
    completed_at   TIMESTAMPTZ,
    objective_json JSONB NOT NULL
);
"#;

/// Connection factory for the four Postgres-backed repositories.
pub struct PostgresRepositories {
    pool: PgPool,
}

impl PostgresRepositories {
    /// Connect and ensure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .context("failed to connect to the durable store")?;

        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .context("failed to ensure durable store schema")?;
        }

        Ok(Self { pool })
    }

    pub fn records(&self) -> PostgresRecordRepository {
        PostgresRecordRepository { pool: self.pool.clone() }
    }

    pub fn decisions(&self) -> PostgresDecisionRepository {
        PostgresDecisionRepository { pool: self.pool.clone() }
    }

    pub fn patterns(&self) -> PostgresPatternRepository {
        PostgresPatternRepository { pool: self.pool.clone() }
    }

    pub fn objectives(&self) -> PostgresObjectiveRepository {
        PostgresObjectiveRepository { pool: self.pool.clone() }
    }
}

pub struct PostgresRecordRepository {
    pool: PgPool,
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<MemoryRecord> {
    let json: serde_json::Value = row.get("record_json");
    serde_json::from_value(json).context("failed to deserialize memory record")
}

#[async_trait]
impl RecordRepository for PostgresRecordRepository {
    async fn upsert(&self, record: &MemoryRecord) -> Result<()> {
        let json = serde_json::to_value(record).context("failed to serialize memory record")?;
        sqlx::query(
            r#"
            INSERT INTO memory_records (
                id, owner, category, importance, unembedded, embedding,
                record_json, created_at, last_accessed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                owner = EXCLUDED.owner,
                category = EXCLUDED.category,
                importance = EXCLUDED.importance,
                unembedded = EXCLUDED.unembedded,
                embedding = EXCLUDED.embedding,
                record_json = EXCLUDED.record_json,
                last_accessed = EXCLUDED.last_accessed
            "#,
        )
        .bind(record.id.0)
        .bind(&record.owner)
        .bind(&record.category)
        .bind(record.importance())
        .bind(record.unembedded)
        .bind(&record.embedding)
        .bind(json)
        .bind(record.created_at)
        .bind(record.last_accessed)
        .execute(&self.pool)
        .await
        .context("failed to upsert memory record")?;
        Ok(())
    }

    async fn get(&self, id: MemoryId) -> Result<Option<MemoryRecord>> {
        let row = sqlx::query("SELECT record_json FROM memory_records WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch memory record")?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn delete(&self, id: MemoryId) -> Result<()> {
        sqlx::query("DELETE FROM memory_records WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .context("failed to delete memory record")?;
        Ok(())
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<MemoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT record_json FROM memory_records
            WHERE ($1::text IS NULL OR owner = $1)
              AND ($2::text IS NULL OR category = $2)
              AND ($3::float8 IS NULL OR importance >= $3)
            "#,
        )
        .bind(filter.owner.as_deref())
        .bind(filter.category.as_deref())
        .bind(filter.min_importance)
        .fetch_all(&self.pool)
        .await
        .context("failed to list memory records")?;
        rows.iter().map(record_from_row).collect()
    }

    async fn search_similar(
        &self,
        embedding: &[f32],
        filter: &RecordFilter,
        limit: usize,
    ) -> Result<Vec<(MemoryRecord, f64)>> {
        let rows = sqlx::query(
            r#"
            SELECT record_json FROM memory_records
            WHERE NOT unembedded
              AND ($1::text IS NULL OR owner = $1)
              AND ($2::text IS NULL OR category = $2)
              AND ($3::float8 IS NULL OR importance >= $3)
            "#,
        )
        .bind(filter.owner.as_deref())
        .bind(filter.category.as_deref())
        .bind(filter.min_importance)
        .fetch_all(&self.pool)
        .await
        .context("failed to scan memory records for similarity search")?;

        let mut scored: Vec<(MemoryRecord, f64)> = rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .map(|record| {
                let similarity = cosine_similarity(embedding, &record.embedding);
                (record, similarity)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM memory_records")
            .fetch_one(&self.pool)
            .await
            .context("failed to count memory records")?;
        let n: i64 = row.get("n");
        Ok(n as u64)
    }
}

pub struct PostgresDecisionRepository {
    pool: PgPool,
}

fn decision_from_row(row: &sqlx::postgres::PgRow) -> Result<DecisionRecord> {
    let json: serde_json::Value = row.get("decision_json");
    serde_json::from_value(json).context("failed to deserialize decision record")
}

#[async_trait]
impl DecisionRepository for PostgresDecisionRepository {
    async fn upsert(&self, decision: &DecisionRecord) -> Result<()> {
        let json = serde_json::to_value(decision).context("failed to serialize decision record")?;
        sqlx::query(
            r#"
            INSERT INTO decision_records (id, decision_type, decision_json, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET decision_json = EXCLUDED.decision_json
            "#,
        )
        .bind(decision.id.0)
        .bind(&decision.decision_type)
        .bind(json)
        .bind(decision.created_at)
        .execute(&self.pool)
        .await
        .context("failed to upsert decision record")?;
        Ok(())
    }

    async fn get(&self, id: DecisionId) -> Result<Option<DecisionRecord>> {
        let row = sqlx::query("SELECT decision_json FROM decision_records WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch decision record")?;
        row.as_ref().map(decision_from_row).transpose()
    }

    async fn list_by_type(&self, decision_type: &str) -> Result<Vec<DecisionRecord>> {
        let rows = sqlx::query(
            "SELECT decision_json FROM decision_records WHERE decision_type = $1 ORDER BY created_at DESC",
        )
        .bind(decision_type)
        .fetch_all(&self.pool)
        .await
        .context("failed to list decisions by type")?;
        rows.iter().map(decision_from_row).collect()
    }

    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<DecisionRecord>> {
        let rows = sqlx::query(
            "SELECT decision_json FROM decision_records WHERE created_at >= $1 ORDER BY created_at DESC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .context("failed to list recent decisions")?;
        rows.iter().map(decision_from_row).collect()
    }

    async fn count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM decision_records")
            .fetch_one(&self.pool)
            .await
            .context("failed to count decision records")?;
        let n: i64 = row.get("n");
        Ok(n as u64)
    }
}

pub struct PostgresPatternRepository {
    pool: PgPool,
}

#[async_trait]
impl PatternRepository for PostgresPatternRepository {
    async fn upsert(&self, pattern: &Pattern) -> Result<()> {
        let json = serde_json::to_value(pattern).context("failed to serialize pattern")?;
        sqlx::query(
            r#"
            INSERT INTO patterns (name, pattern_json, last_seen)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET
                pattern_json = EXCLUDED.pattern_json,
                last_seen = EXCLUDED.last_seen
            "#,
        )
        .bind(&pattern.name)
        .bind(json)
        .bind(pattern.last_seen)
        .execute(&self.pool)
        .await
        .context("failed to upsert pattern")?;
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Pattern>> {
        let row = sqlx::query("SELECT pattern_json FROM patterns WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch pattern")?;
        row.map(|r| {
            let json: serde_json::Value = r.get("pattern_json");
            serde_json::from_value(json).context("failed to deserialize pattern")
        })
        .transpose()
    }

    async fn list(&self) -> Result<Vec<Pattern>> {
        let rows = sqlx::query("SELECT pattern_json FROM patterns")
            .fetch_all(&self.pool)
            .await
            .context("failed to list patterns")?;
        rows.iter()
            .map(|r| {
                let json: serde_json::Value = r.get("pattern_json");
                serde_json::from_value(json).context("failed to deserialize pattern")
            })
            .collect()
    }

    async fn count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM patterns")
            .fetch_one(&self.pool)
            .await
            .context("failed to count patterns")?;
        let n: i64 = row.get("n");
        Ok(n as u64)
    }
}

pub struct PostgresObjectiveRepository {
    pool: PgPool,
}

fn objective_from_row(row: &sqlx::postgres::PgRow) -> Result<LearningObjective> {
    let json: serde_json::Value = row.get("objective_json");
    serde_json::from_value(json).context("failed to deserialize learning objective")
}

#[async_trait]
impl ObjectiveRepository for PostgresObjectiveRepository {
    async fn upsert(&self, objective: &LearningObjective) -> Result<()> {
        let json = serde_json::to_value(objective).context("failed to serialize learning objective")?;
        sqlx::query(
            r#"
            INSERT INTO learning_objectives (id, priority, completed_at, objective_json)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                priority = EXCLUDED.priority,
                completed_at = EXCLUDED.completed_at,
                objective_json = EXCLUDED.objective_json
            "#,
        )
        .bind(objective.id.0)
        .bind(objective.priority)
        .bind(objective.completed_at)
        .bind(json)
        .execute(&self.pool)
        .await
        .context("failed to upsert learning objective")?;
        Ok(())
    }

    async fn get(&self, id: ObjectiveId) -> Result<Option<LearningObjective>> {
        let row = sqlx::query("SELECT objective_json FROM learning_objectives WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch learning objective")?;
        row.as_ref().map(objective_from_row).transpose()
    }

    async fn list_open(&self) -> Result<Vec<LearningObjective>> {
        let rows = sqlx::query(
            "SELECT objective_json FROM learning_objectives WHERE completed_at IS NULL ORDER BY priority DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list open objectives")?;
        rows.iter().map(objective_from_row).collect()
    }

    async fn count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM learning_objectives")
            .fetch_one(&self.pool)
            .await
            .context("failed to count learning objectives")?;
        let n: i64 = row.get("n");
        Ok(n as u64)
    }
}
