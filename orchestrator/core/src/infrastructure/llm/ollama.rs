// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Ollama Completion Adapter
//
// Anti-Corruption Layer for Ollama local models
// Supports air-gapped deployments with local LLMs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::completion::{
    Completion, CompletionClient, ProviderError, SamplingParams, TokenUsage,
};

pub struct OllamaAdapter {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
    eval_count: Option<u32>,
    prompt_eval_count: Option<u32>,
}

impl OllamaAdapter {
    pub fn new(endpoint: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model,
        }
    }
}

#[async_trait]
impl CompletionClient for OllamaAdapter {
    async fn complete(
        &self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<Completion, ProviderError> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: Some(OllamaOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens.map(|t| t as i32),
                stop: params.stop_sequences.clone(),
            }),
        };

        let url = format!("{}/api/generate", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            return Err(if status == 404 {
                ProviderError::ModelNotFound(self.model.clone())
            } else if status.is_client_error() {
                ProviderError::InvalidRequest(format!("HTTP {status}: {body}"))
            } else {
                ProviderError::Provider(format!("HTTP {status}: {body}"))
            });
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Provider(format!("Failed to parse response: {e}")))?;

        let prompt_tokens = ollama_response.prompt_eval_count.unwrap_or(0);
        let completion_tokens = ollama_response.eval_count.unwrap_or(0);

        Ok(Completion {
            text: ollama_response.response,
            provider: "ollama".to_string(),
            model: self.model.clone(),
            usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        // Check the server is up by listing local models.
        let url = format!("{}/api/tags", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_completion_is_parsed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_body(
                r#"{"response":"4","done":true,"eval_count":1,"prompt_eval_count":9}"#,
            )
            .create_async()
            .await;

        let adapter = OllamaAdapter::new(server.url(), "llama3.2".into());
        let completion = adapter
            .complete("Compute 2+2", &SamplingParams::default())
            .await
            .unwrap();

        assert_eq!(completion.text, "4");
        assert_eq!(completion.usage.total_tokens, 10);
        assert_eq!(completion.provider, "ollama");
    }

    #[tokio::test]
    async fn health_check_hits_tags_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[]}"#)
            .create_async()
            .await;

        let adapter = OllamaAdapter::new(server.url(), "llama3.2".into());
        adapter.health_check().await.unwrap();
        mock.assert_async().await;
    }
}
