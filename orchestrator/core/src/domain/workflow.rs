// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workflow Definition
//!
//! A workflow definition is consumed from configuration, not owned by the
//! engine: it names the participating agents (in registration order), the
//! step ceiling and the whole-run timeout.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowKind {
    /// Steps execute strictly in order; later steps may depend on earlier
    /// outputs, so steps are never parallelized inside a run.
    #[default]
    Sequential,
}

#[derive(Debug, Error)]
pub enum WorkflowDefinitionError {
    #[error("workflow name cannot be empty")]
    EmptyName,

    #[error("workflow max_steps must be at least 1")]
    ZeroMaxSteps,

    #[error("workflow timeout_seconds must be at least 1")]
    ZeroTimeout,
}

/// Declarative workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,

    #[serde(rename = "type", default)]
    pub kind: WorkflowKind,

    /// Agents participating in this workflow, in selection tie-break order.
    /// Empty means all configured agents, in configuration order.
    #[serde(default)]
    pub agents: Vec<String>,

    /// Ceiling on decomposed step count, checked before execution starts.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Whole-run timeout, checked at step boundaries.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl WorkflowDefinition {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn validate(&self) -> Result<(), WorkflowDefinitionError> {
        if self.name.is_empty() {
            return Err(WorkflowDefinitionError::EmptyName);
        }
        if self.max_steps == 0 {
            return Err(WorkflowDefinitionError::ZeroMaxSteps);
        }
        if self.timeout_seconds == 0 {
            return Err(WorkflowDefinitionError::ZeroTimeout);
        }
        Ok(())
    }
}

impl Default for WorkflowDefinition {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            kind: WorkflowKind::Sequential,
            agents: Vec::new(),
            max_steps: default_max_steps(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_max_steps() -> usize {
    10
}

fn default_timeout_seconds() -> u64 {
    600
}
