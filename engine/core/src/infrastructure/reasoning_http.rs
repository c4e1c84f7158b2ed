// Reasoning Provider HTTP Adapter
//
// Anti-Corruption Layer for the hosted reasoning gateway.
// The gateway is contracted to answer with a WorkerReply JSON document;
// anything else is rejected as malformed rather than interpreted.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::domain::provider::{GenerationRequest, ProviderError, ReasoningProvider, WorkerReply};

pub struct HttpReasoningProvider {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct GenerateRequestBody<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

impl HttpReasoningProvider {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            timeout,
        }
    }
}

#[async_trait]
impl ReasoningProvider for HttpReasoningProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<WorkerReply, ProviderError> {
        let url = format!("{}/v1/generate", self.endpoint.trim_end_matches('/'));
        let body = GenerateRequestBody {
            model: &request.profile.model,
            prompt: &request.prompt,
            temperature: request.profile.temperature,
            max_tokens: request.profile.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout)
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Provider(format!("HTTP {}: {}", status, error_text)));
        }

        let raw = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        WorkerReply::parse(&raw)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        let url = format!("{}/health", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::Network(format!("HTTP {}", response.status())))
        }
    }
}
