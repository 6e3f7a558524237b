// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent Domain Model
//!
//! Workers are capability providers invoked to produce a step's result.
//! The registry indexes implementations by name and capability tags, never
//! by concrete type, so worker variants stay polymorphic behind the
//! `Worker` trait.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Worker capability interface and static agent catalog

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::context::ContextSnapshot;

/// Static description of a registered worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique agent name.
    pub name: String,

    /// Capability tags, e.g. `computation`, `analysis`, `research`.
    pub capabilities: Vec<String>,

    /// Human-readable description, surfaced to the decomposition prompt.
    pub description: String,
}

impl AgentDescriptor {
    pub fn new(
        name: impl Into<String>,
        capabilities: Vec<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            capabilities,
            description: description.into(),
        }
    }

    pub fn has_capability(&self, tag: &str) -> bool {
        self.capabilities.iter().any(|c| c == tag)
    }
}

/// Worker-level failure, wrapping the underlying cause.
///
/// `permanent` failures short-circuit the sequencer's retry loop; everything
/// else is retried up to the configured attempt ceiling.
#[derive(Debug, Error)]
#[error("agent '{agent}' execution failed: {source}")]
pub struct AgentExecutionError {
    /// Name of the failing agent.
    pub agent: String,

    /// Whether retrying the same invocation can possibly succeed.
    pub permanent: bool,

    #[source]
    pub source: anyhow::Error,
}

impl AgentExecutionError {
    pub fn transient(agent: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            agent: agent.into(),
            permanent: false,
            source: source.into(),
        }
    }

    pub fn permanent(agent: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            agent: agent.into(),
            permanent: true,
            source: source.into(),
        }
    }

    pub fn timed_out(agent: impl Into<String>, after: std::time::Duration) -> Self {
        Self {
            agent: agent.into(),
            permanent: false,
            source: anyhow::anyhow!("invocation timed out after {after:?}"),
        }
    }
}

/// Worker capability interface.
///
/// `process` receives the resolved task text together with a snapshot of
/// the run context so far; retries of a step see identical inputs.
#[async_trait]
pub trait Worker: Send + Sync {
    fn descriptor(&self) -> &AgentDescriptor;

    async fn process(
        &self,
        task: &str,
        context: &ContextSnapshot,
    ) -> Result<String, AgentExecutionError>;
}

/// Outcome of agent selection for one step.
///
/// `NoAgent` is a valid non-error outcome meaning the step requires no
/// worker invocation; its output is propagated from the prior step.
#[derive(Clone)]
pub enum Selection {
    Agent(Arc<dyn Worker>),
    NoAgent,
}

impl Selection {
    pub fn is_no_agent(&self) -> bool {
        matches!(self, Selection::NoAgent)
    }

    pub fn agent_name(&self) -> Option<&str> {
        match self {
            Selection::Agent(worker) => Some(worker.descriptor().name.as_str()),
            Selection::NoAgent => None,
        }
    }
}

impl std::fmt::Debug for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selection::Agent(worker) => write!(f, "Agent({})", worker.descriptor().name),
            Selection::NoAgent => write!(f, "NoAgent"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("agent '{0}' is already registered")]
    DuplicateName(String),
}

/// Static, read-mostly catalog of capability-tagged workers.
///
/// Registration order is significant: the selector uses it as the
/// deterministic tie-break when several agents match a task. Built once at
/// startup and shared read-only afterwards.
#[derive(Default)]
pub struct AgentRegistry {
    workers: Vec<Arc<dyn Worker>>,
    by_name: HashMap<String, usize>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            workers: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register a worker. Names must be unique.
    pub fn register(&mut self, worker: Arc<dyn Worker>) -> Result<(), RegistryError> {
        let name = worker.descriptor().name.clone();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.by_name.insert(name, self.workers.len());
        self.workers.push(worker);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Worker>> {
        self.by_name
            .get(name)
            .map(|&idx| Arc::clone(&self.workers[idx]))
    }

    /// Workers in registration order.
    pub fn workers(&self) -> &[Arc<dyn Worker>] {
        &self.workers
    }

    /// Descriptors in registration order, for the decomposition prompt.
    pub fn descriptors(&self) -> Vec<AgentDescriptor> {
        self.workers.iter().map(|w| w.descriptor().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoWorker {
        descriptor: AgentDescriptor,
    }

    impl EchoWorker {
        fn named(name: &str) -> Arc<dyn Worker> {
            Arc::new(Self {
                descriptor: AgentDescriptor::new(name, vec!["general".into()], "echoes input"),
            })
        }
    }

    #[async_trait]
    impl Worker for EchoWorker {
        fn descriptor(&self) -> &AgentDescriptor {
            &self.descriptor
        }

        async fn process(
            &self,
            task: &str,
            _context: &ContextSnapshot,
        ) -> Result<String, AgentExecutionError> {
            Ok(task.to_string())
        }
    }

    #[test]
    fn registration_preserves_order() {
        let mut registry = AgentRegistry::new();
        registry.register(EchoWorker::named("first")).unwrap();
        registry.register(EchoWorker::named("second")).unwrap();
        registry.register(EchoWorker::named("third")).unwrap();

        let names: Vec<_> = registry
            .descriptors()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut registry = AgentRegistry::new();
        registry.register(EchoWorker::named("dup")).unwrap();

        let err = registry.register(EchoWorker::named("dup")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(name) if name == "dup"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_by_name() {
        let mut registry = AgentRegistry::new();
        registry.register(EchoWorker::named("solo")).unwrap();

        assert!(registry.get("solo").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[tokio::test]
    async fn worker_processes_task() {
        let worker = EchoWorker::named("echo");
        let out = worker
            .process("hello", &ContextSnapshot::default())
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn error_classification_helpers() {
        let transient = AgentExecutionError::transient("a", anyhow::anyhow!("net"));
        assert!(!transient.permanent);

        let permanent = AgentExecutionError::permanent("a", anyhow::anyhow!("auth"));
        assert!(permanent.permanent);

        let timeout = AgentExecutionError::timed_out("a", std::time::Duration::from_secs(5));
        assert!(!timeout.permanent);
    }
}
