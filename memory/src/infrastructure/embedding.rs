// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Embedding provider boundary.
//!
//! The store computes one embedding per inserted record. The dimension is
//! fixed by agreement with the durable store's vector column; adapters must
//! return exactly that many components or the call is rejected.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Dimension shared with the durable store's embedding column
/// (all-MiniLM-L6-v2 family).
pub const EMBEDDING_DIMENSION: usize = 384;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("network error: {0}")]
    Network(String),

    #[error("embedding call timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("provider returned {actual} components, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `text` into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// HTTP adapter for an Ollama-style embedding endpoint.
pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl HttpEmbeddingClient {
    pub fn new(endpoint: String, model: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model,
            timeout,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/api/embeddings", self.endpoint.trim_end_matches('/'));
        let request = EmbedRequest { model: &self.model, prompt: text };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout(self.timeout)
                } else {
                    EmbeddingError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider(format!("HTTP {}: {}", status, body)));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Provider(format!("failed to parse response: {}", e)))?;

        if parsed.embedding.len() != EMBEDDING_DIMENSION {
            return Err(EmbeddingError::DimensionMismatch {
                expected: EMBEDDING_DIMENSION,
                actual: parsed.embedding.len(),
            });
        }

        Ok(parsed.embedding)
    }
}

/// Deterministic hash-based embedding.
///
/// Stands in for the external model in tests and air-gapped deployments;
/// identical text always embeds identically.
pub struct HashEmbedding {
    dimension: usize,
}

impl HashEmbedding {
    pub fn new() -> Self {
        Self { dimension: EMBEDDING_DIMENSION }
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut components = Vec::with_capacity(self.dimension);
        for chunk in 0..self.dimension {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            chunk.hash(&mut hasher);
            let bits = hasher.finish();
            // Map to [-1, 1] so cosine similarity behaves.
            components.push((bits as f64 / u64::MAX as f64 * 2.0 - 1.0) as f32);
        }
        Ok(components)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embedding_is_deterministic() {
        let provider = HashEmbedding::with_dimension(16);
        let a = provider.embed("same text").await.unwrap();
        let b = provider.embed("same text").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[tokio::test]
    async fn hash_embedding_distinguishes_texts() {
        let provider = HashEmbedding::with_dimension(16);
        let a = provider.embed("invoice overdue").await.unwrap();
        let b = provider.embed("crew scheduling").await.unwrap();
        assert_ne!(a, b);
    }
}
