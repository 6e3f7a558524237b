// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Completion Service Domain Interface (Anti-Corruption Layer)
//
// Defines the domain interface for text-completion backends. Keeps the
// orchestration core independent of vendor APIs; adapters live in
// infrastructure/llm/.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sampling parameters for one completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 = deterministic).
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,

    /// Sequences that stop generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            stop_sequences: None,
        }
    }
}

fn default_max_tokens() -> Option<u32> {
    Some(4096)
}

fn default_temperature() -> Option<f32> {
    Some(0.7)
}

#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A backend's answer to one completion request.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Generated text.
    pub text: String,

    /// Provider type that produced it (e.g. "openai", "ollama").
    pub provider: String,

    /// Model identifier used.
    pub model: String,

    /// Token usage stats.
    pub usage: TokenUsage,
}

/// Completion-service failure.
///
/// Variants classify into transient (retryable: timeouts, rate limits,
/// network, upstream 5xx) and permanent (not retryable: auth, invalid
/// request, unknown model) via [`ProviderError::is_transient`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limit exceeded")]
    RateLimit,

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("provider error: {0}")]
    Provider(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_) | ProviderError::RateLimit | ProviderError::Provider(_)
        )
    }

    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}

/// Domain interface for completion backends.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for the given prompt.
    async fn complete(
        &self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<Completion, ProviderError>;

    /// Check that the backend is reachable and credentials are valid.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
