// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Anthropic Completion Adapter
//
// Anti-Corruption Layer for the Anthropic Messages API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::completion::{
    Completion, CompletionClient, ProviderError, SamplingParams, TokenUsage,
};

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";

pub struct AnthropicAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicAdapter {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT.to_string(), api_key, model)
    }

    /// Endpoint override for compatible gateways (and tests).
    pub fn with_endpoint(endpoint: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl CompletionClient for AnthropicAdapter {
    async fn complete(
        &self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<Completion, ProviderError> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: params.max_tokens.unwrap_or(4096),
            temperature: params.temperature,
            stop_sequences: params.stop_sequences.clone(),
        };

        let url = format!("{}/v1/messages", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            return Err(if status == 401 || status == 403 {
                ProviderError::Authentication(body)
            } else if status == 429 {
                ProviderError::RateLimit
            } else if status == 404 {
                ProviderError::ModelNotFound(self.model.clone())
            } else if status.is_client_error() {
                ProviderError::InvalidRequest(format!("HTTP {status}: {body}"))
            } else {
                ProviderError::Provider(format!("HTTP {status}: {body}"))
            });
        }

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Provider(format!("Failed to parse response: {e}")))?;

        let text = anthropic_response
            .content
            .first()
            .map(|c| c.text.clone())
            .unwrap_or_default();

        Ok(Completion {
            text,
            provider: "anthropic".to_string(),
            model: self.model.clone(),
            usage: TokenUsage {
                prompt_tokens: anthropic_response.usage.input_tokens,
                completion_tokens: anthropic_response.usage.output_tokens,
                total_tokens: anthropic_response.usage.input_tokens
                    + anthropic_response.usage.output_tokens,
            },
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        // Anthropic has no models-list endpoint; probe auth with a GET.
        // 404/405 mean the endpoint is reachable and the key was accepted.
        let url = format!("{}/v1/messages", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if response.status().is_success()
            || response.status() == 404
            || response.status() == 405
        {
            Ok(())
        } else if response.status() == 401 || response.status() == 403 {
            Err(ProviderError::Authentication("Invalid API key".into()))
        } else {
            Err(ProviderError::Network(format!("HTTP {}", response.status())))
        }
    }
}
