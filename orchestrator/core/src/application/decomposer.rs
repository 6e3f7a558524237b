// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Decomposer Application Service
//!
//! Turns a free-text user request into an ordered list of dependent
//! subtasks by issuing one structured completion request and parsing the
//! numbered list out of the reply.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Request -> ordered `TaskStep` sequence
//! - **Dependencies:** Domain (CompletionClient), Infrastructure (prompts)
//!
//! Parsing tolerates numbered-list formatting variance (leading numerals
//! with `.`, `)`, `:` or `-` punctuation); lines that do not parse as a
//! numbered item are discarded. Indices must come out exactly `1..=N`;
//! a gapped or duplicated numbering is surfaced as an error, never silently
//! renumbered.

use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::domain::agent::AgentDescriptor;
use crate::domain::completion::{CompletionClient, ProviderError, SamplingParams};
use crate::domain::run::TaskStep;
use crate::infrastructure::prompts;

#[derive(Debug, Error)]
pub enum DecompositionError {
    #[error("completion backend failed during decomposition: {0}")]
    Completion(#[from] ProviderError),

    #[error("failed to render decomposition prompt: {0}")]
    Prompt(#[from] handlebars::RenderError),

    #[error("decomposition produced no parsable tasks")]
    Empty,

    #[error("decomposition indices are not contiguous: expected step {expected}, found step {found}")]
    NonContiguous { expected: usize, found: usize },
}

/// Application service decomposing requests via the completion backend.
pub struct Decomposer {
    client: Arc<dyn CompletionClient>,
    params: SamplingParams,
}

impl Decomposer {
    pub fn new(client: Arc<dyn CompletionClient>, params: SamplingParams) -> Self {
        Self { client, params }
    }

    /// Decompose a request into an ordered, contiguous task sequence.
    pub async fn decompose(
        &self,
        request: &str,
        available_agents: &[AgentDescriptor],
    ) -> Result<Vec<TaskStep>, DecompositionError> {
        let prompt = prompts::render_decomposition(request, available_agents)?;
        let completion = self.client.complete(&prompt, &self.params).await?;

        let steps = parse_numbered_list(&completion.text)?;
        debug!(count = steps.len(), "request decomposed");
        Ok(steps)
    }
}

fn numbered_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Leading numeral, optional `.` `)` `:` or `-` punctuation, then the body.
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+)\s*[.):\-]?\s+(.+?)\s*$").expect("numbered-item pattern")
    })
}

/// Extract `(index, text)` items from a numbered-list reply and validate
/// that indices are exactly `1..=N` in order.
fn parse_numbered_list(text: &str) -> Result<Vec<TaskStep>, DecompositionError> {
    let mut steps = Vec::new();

    for line in text.lines() {
        let Some(caps) = numbered_item_regex().captures(line) else {
            continue;
        };
        let Ok(index) = caps[1].parse::<usize>() else {
            continue;
        };
        steps.push(TaskStep::new(index, caps[2].to_string()));
    }

    if steps.is_empty() {
        return Err(DecompositionError::Empty);
    }

    for (position, step) in steps.iter().enumerate() {
        let expected = position + 1;
        if step.index != expected {
            return Err(DecompositionError::NonContiguous {
                expected,
                found: step.index,
            });
        }
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::completion::{Completion, TokenUsage};
    use async_trait::async_trait;

    /// Completion stub replying with a canned decomposition.
    struct CannedCompletion {
        reply: String,
    }

    impl CannedCompletion {
        fn client(reply: &str) -> Arc<dyn CompletionClient> {
            Arc::new(Self {
                reply: reply.to_string(),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for CannedCompletion {
        async fn complete(
            &self,
            _prompt: &str,
            _params: &SamplingParams,
        ) -> Result<Completion, ProviderError> {
            Ok(Completion {
                text: self.reply.clone(),
                provider: "test".into(),
                model: "test".into(),
                usage: TokenUsage::default(),
            })
        }

        async fn health_check(&self) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn agents() -> Vec<AgentDescriptor> {
        vec![AgentDescriptor::new(
            "solver",
            vec!["computation".into()],
            "Handles computation",
        )]
    }

    #[tokio::test]
    async fn parses_plain_numbered_list() {
        let decomposer = Decomposer::new(
            CannedCompletion::client("1. Compute 2+2\n2. Present the final result"),
            SamplingParams::default(),
        );
        let steps = decomposer.decompose("What is 2+2?", &agents()).await.unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0], TaskStep::new(1, "Compute 2+2"));
        assert_eq!(steps[1], TaskStep::new(2, "Present the final result"));
    }

    #[tokio::test]
    async fn tolerates_punctuation_variance_and_prose() {
        let reply = "Sure, here is the plan:\n\
                     1) Load the sales data\n\
                     2 - Analyze step_1_output for trends\n\
                     3: Present step_2_output\n\
                     Let me know if you need anything else.";
        let decomposer = Decomposer::new(CannedCompletion::client(reply), SamplingParams::default());
        let steps = decomposer.decompose("analyze sales", &agents()).await.unwrap();

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].text, "Load the sales data");
        assert_eq!(steps[1].text, "Analyze step_1_output for trends");
        assert_eq!(steps[2].text, "Present step_2_output");
    }

    #[tokio::test]
    async fn empty_decomposition_is_an_error() {
        let decomposer = Decomposer::new(
            CannedCompletion::client("I cannot break this down."),
            SamplingParams::default(),
        );
        let err = decomposer.decompose("request", &agents()).await.unwrap_err();
        assert!(matches!(err, DecompositionError::Empty));
    }

    #[tokio::test]
    async fn gapped_indices_are_an_error() {
        let decomposer = Decomposer::new(
            CannedCompletion::client("1. First\n3. Third"),
            SamplingParams::default(),
        );
        let err = decomposer.decompose("request", &agents()).await.unwrap_err();
        assert!(matches!(
            err,
            DecompositionError::NonContiguous {
                expected: 2,
                found: 3
            }
        ));
    }

    #[tokio::test]
    async fn duplicate_indices_are_an_error() {
        let decomposer = Decomposer::new(
            CannedCompletion::client("1. First\n1. Again"),
            SamplingParams::default(),
        );
        let err = decomposer.decompose("request", &agents()).await.unwrap_err();
        assert!(matches!(err, DecompositionError::NonContiguous { .. }));
    }

    #[tokio::test]
    async fn numbering_not_starting_at_one_is_an_error() {
        let decomposer = Decomposer::new(
            CannedCompletion::client("2. First\n3. Second"),
            SamplingParams::default(),
        );
        let err = decomposer.decompose("request", &agents()).await.unwrap_err();
        assert!(matches!(
            err,
            DecompositionError::NonContiguous {
                expected: 1,
                found: 2
            }
        ));
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        struct FailingCompletion;

        #[async_trait]
        impl CompletionClient for FailingCompletion {
            async fn complete(
                &self,
                _prompt: &str,
                _params: &SamplingParams,
            ) -> Result<Completion, ProviderError> {
                Err(ProviderError::RateLimit)
            }

            async fn health_check(&self) -> Result<(), ProviderError> {
                Ok(())
            }
        }

        let decomposer = Decomposer::new(Arc::new(FailingCompletion), SamplingParams::default());
        let err = decomposer.decompose("request", &agents()).await.unwrap_err();
        assert!(matches!(
            err,
            DecompositionError::Completion(ProviderError::RateLimit)
        ));
    }
}
