// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Prompt Templates
//!
//! Handlebars templates for the decomposition request and the default
//! worker prompt.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Transform templates with placeholders into final prompts

use handlebars::{Handlebars, RenderError};
use serde::Serialize;

use crate::domain::agent::AgentDescriptor;
use crate::domain::context::ContextSnapshot;

/// Template for the single structured decomposition request.
///
/// The backend is instructed to emit a numbered list of self-contained
/// subtasks and to use the reserved `step_N_output` form wherever a subtask
/// consumes a prior subtask's result.
pub const DECOMPOSITION_TEMPLATE: &str = "\
You are a task decomposition expert. Break down the user's request into \
smaller, self-contained tasks.

User request: {{request}}

Available agents:
{{#each agents}}
- {{name}}: {{description}} (capabilities: {{tags}})
{{/each}}

Rules:
- Output ONLY a numbered list, one task per line, starting at 1.
- Each task must be clear, specific and assignable to one agent.
- When a task needs the result of an earlier task N, write the literal \
token step_N_output where that result should be inserted.
- The final task should present the result to the user.

Tasks:";

/// Default worker prompt used when an agent has no template of its own.
pub const DEFAULT_WORKER_TEMPLATE: &str = "\
You are {{agent_name}}: {{agent_description}}

Task: {{task}}
{{#if context}}
Results from earlier steps:
{{context}}
{{/if}}
Respond with the task result only, no preamble.";

#[derive(Serialize)]
struct AgentLine {
    name: String,
    description: String,
    tags: String,
}

#[derive(Serialize)]
struct DecompositionVars {
    request: String,
    agents: Vec<AgentLine>,
}

#[derive(Serialize)]
struct WorkerVars {
    agent_name: String,
    agent_description: String,
    task: String,
    context: String,
}

fn engine() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    // Missing variables render empty rather than erroring.
    handlebars.set_strict_mode(false);
    handlebars
}

/// Render the decomposition prompt for a request and the visible agents.
pub fn render_decomposition(
    request: &str,
    agents: &[AgentDescriptor],
) -> Result<String, RenderError> {
    let vars = DecompositionVars {
        request: request.to_string(),
        agents: agents
            .iter()
            .map(|a| AgentLine {
                name: a.name.clone(),
                description: a.description.clone(),
                tags: a.capabilities.join(", "),
            })
            .collect(),
    };
    engine().render_template(DECOMPOSITION_TEMPLATE, &vars)
}

/// Render a worker prompt from the agent's template (or the default).
pub fn render_worker(
    template: Option<&str>,
    descriptor: &AgentDescriptor,
    task: &str,
    context: &ContextSnapshot,
) -> Result<String, RenderError> {
    let vars = WorkerVars {
        agent_name: descriptor.name.clone(),
        agent_description: descriptor.description.clone(),
        task: task.to_string(),
        context: context.rendered(),
    };
    engine().render_template(template.unwrap_or(DEFAULT_WORKER_TEMPLATE), &vars)
}
