// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// OpenAI Completion Adapter
//
// Anti-Corruption Layer for the OpenAI chat-completions API.
// Also works with OpenAI-compatible servers (LM Studio, vLLM, etc.)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::completion::{
    Completion, CompletionClient, ProviderError, SamplingParams, TokenUsage,
};

pub struct OpenAIAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl OpenAIAdapter {
    pub fn new(endpoint: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
        }
    }
}

fn classify_status(status: reqwest::StatusCode, model: &str, body: String) -> ProviderError {
    if status == 401 || status == 403 {
        ProviderError::Authentication(body)
    } else if status == 429 {
        ProviderError::RateLimit
    } else if status == 404 {
        ProviderError::ModelNotFound(model.to_string())
    } else if status.is_client_error() {
        ProviderError::InvalidRequest(format!("HTTP {status}: {body}"))
    } else {
        // 5xx and anything else upstream: worth retrying.
        ProviderError::Provider(format!("HTTP {status}: {body}"))
    }
}

#[async_trait]
impl CompletionClient for OpenAIAdapter {
    async fn complete(
        &self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<Completion, ProviderError> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stop: params.stop_sequences.clone(),
        };

        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &self.model, body));
        }

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Provider(format!("Failed to parse response: {e}")))?;

        let choice = openai_response
            .choices
            .first()
            .ok_or_else(|| ProviderError::Provider("No response from model".into()))?;

        let usage = openai_response.usage.as_ref();
        Ok(Completion {
            text: choice.message.content.clone(),
            provider: "openai".to_string(),
            model: self.model.clone(),
            usage: TokenUsage {
                prompt_tokens: usage.map_or(0, |u| u.prompt_tokens),
                completion_tokens: usage.map_or(0, |u| u.completion_tokens),
                total_tokens: usage.map_or(0, |u| u.total_tokens),
            },
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        let url = format!("{}/models", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else if response.status() == 401 || response.status() == 403 {
            Err(ProviderError::Authentication("Invalid API key".into()))
        } else {
            Err(ProviderError::Network(format!("HTTP {}", response.status())))
        }
    }
}
