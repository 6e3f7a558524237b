// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent Construction
//!
//! Builds the agent registry from configuration: each catalog entry becomes
//! a [`CompletionWorker`] bound to its completion provider, prompt template
//! and sampling parameters.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Config -> Worker instances -> AgentRegistry

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::agent::{AgentDescriptor, AgentExecutionError, AgentRegistry, Worker};
use crate::domain::completion::{CompletionClient, SamplingParams};
use crate::domain::config::{AgentConfig, RouterConfigSpec};
use crate::domain::context::ContextSnapshot;
use crate::infrastructure::llm::ProviderRegistry;
use crate::infrastructure::prompts;

/// Worker backed by a completion provider.
///
/// Renders its prompt from the resolved task text plus the context
/// snapshot, delegates to the provider and validates the reply is
/// non-empty.
pub struct CompletionWorker {
    descriptor: AgentDescriptor,
    client: Arc<dyn CompletionClient>,
    params: SamplingParams,
    prompt_template: Option<String>,
}

impl CompletionWorker {
    pub fn new(
        descriptor: AgentDescriptor,
        client: Arc<dyn CompletionClient>,
        params: SamplingParams,
        prompt_template: Option<String>,
    ) -> Self {
        Self {
            descriptor,
            client,
            params,
            prompt_template,
        }
    }
}

#[async_trait]
impl Worker for CompletionWorker {
    fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    async fn process(
        &self,
        task: &str,
        context: &ContextSnapshot,
    ) -> Result<String, AgentExecutionError> {
        let prompt = prompts::render_worker(
            self.prompt_template.as_deref(),
            &self.descriptor,
            task,
            context,
        )
        // A broken template cannot succeed on retry.
        .map_err(|e| AgentExecutionError::permanent(self.descriptor.name.clone(), e))?;

        debug!(agent = %self.descriptor.name, prompt_len = prompt.len(), "invoking provider");

        let completion = self
            .client
            .complete(&prompt, &self.params)
            .await
            .map_err(|e| AgentExecutionError {
                agent: self.descriptor.name.clone(),
                permanent: e.is_permanent(),
                source: e.into(),
            })?;

        let text = completion.text.trim();
        if text.is_empty() {
            return Err(AgentExecutionError::transient(
                self.descriptor.name.clone(),
                anyhow::anyhow!("provider returned an empty completion"),
            ));
        }

        Ok(text.to_string())
    }
}

/// Build the agent registry from configuration.
///
/// Registration order follows `workflow.agents` when given (it is the
/// selection tie-break order), otherwise the catalog order. Unknown agent
/// or provider references fail construction.
pub fn build_registry(
    spec: &RouterConfigSpec,
    providers: &ProviderRegistry,
) -> anyhow::Result<AgentRegistry> {
    let ordered: Vec<&AgentConfig> = if spec.workflow.agents.is_empty() {
        spec.agents.iter().collect()
    } else {
        spec.workflow
            .agents
            .iter()
            .map(|name| {
                spec.agents
                    .iter()
                    .find(|a| &a.name == name)
                    .ok_or_else(|| anyhow::anyhow!("workflow references unknown agent '{name}'"))
            })
            .collect::<anyhow::Result<_>>()?
    };

    let mut registry = AgentRegistry::new();
    for config in ordered {
        let client = providers.get(&config.provider).ok_or_else(|| {
            anyhow::anyhow!(
                "agent '{}' references unknown provider '{}'",
                config.name,
                config.provider
            )
        })?;

        let descriptor = AgentDescriptor::new(
            config.name.clone(),
            config.capabilities.clone(),
            config.description.clone(),
        );

        registry.register(Arc::new(CompletionWorker::new(
            descriptor,
            client,
            config.generation.clone(),
            config.prompt_template.clone(),
        )))?;
    }

    info!(agents = registry.len(), "agent registry built");
    Ok(registry)
}
