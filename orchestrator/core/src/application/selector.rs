// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent Selector Application Service
//!
//! Chooses a worker (or the `NoAgent` sentinel) for each task step with a
//! deterministic, stable policy: never random, never model-driven.
//!
//! # Policy, applied in order
//!
//! 1. A terminal step containing no computation cues is pure presentation
//!    of an already-computed value: return `NoAgent`.
//! 2. Compute the capability matches for the task. Among matches, exclude
//!    agents carrying an analysis-class tag unless the *original user
//!    request* (not the subtask text) carries an analysis-intent keyword.
//! 3. One candidate left: select it. Several: select the one registered
//!    first. Zero (and the task is not presentation-only): fail with
//!    `NoAgentAvailable`, which is an error, unlike `NoAgent`.
//!
//! Capability tags are matched against the task text via keyword-cue
//! tables. The built-in table covers the common tags; configuration can
//! extend or override entries. Tags `general` / `general_tasks` match any
//! task; an unknown tag matches when the tag text itself appears.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::domain::agent::{AgentRegistry, Selection, Worker};
use crate::domain::config::SelectionConfig;
use crate::domain::run::TaskStep;

/// Capability tags that gate on explicit analysis intent in the request.
const ANALYSIS_CLASS_TAGS: &[&str] = &[
    "analysis",
    "data_analysis",
    "summarization",
    "reporting",
    "insights",
];

/// Wildcard tags matching every task.
const WILDCARD_TAGS: &[&str] = &["general", "general_tasks"];

/// Cues that indicate a step still performs new computation (and therefore
/// is not pure presentation of a prior value).
const COMPUTATION_CUES: &[&str] = &[
    "compute", "calculate", "evaluate", "solve", "count", "sum", "analyze", "analyse",
    "research", "search", "find", "look up", "fetch", "gather", "load", "parse",
    "extract", "generate", "write", "create", "draft", "compose", "translate",
    "convert", "plan", "organize", "summarize", "classify", "validate", "verify",
];

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("no capable agent available for step {step_index}: {task}")]
    NoAgentAvailable { step_index: usize, task: String },
}

/// Deterministic capability-based agent selection.
pub struct AgentSelector {
    registry: Arc<AgentRegistry>,
    analysis_keywords: Vec<String>,
    cues: HashMap<String, Vec<String>>,
}

impl AgentSelector {
    pub fn new(registry: Arc<AgentRegistry>, config: &SelectionConfig) -> Self {
        let mut cues = builtin_cues();
        for (tag, words) in &config.capability_cues {
            cues.insert(
                tag.to_lowercase(),
                words.iter().map(|w| w.to_lowercase()).collect(),
            );
        }
        Self {
            registry,
            analysis_keywords: config
                .analysis_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            cues,
        }
    }

    /// Select a worker for one step, or `NoAgent` for a pure-presentation
    /// terminal step.
    pub fn select(
        &self,
        task: &TaskStep,
        total_steps: usize,
        original_request: &str,
    ) -> Result<Selection, SelectionError> {
        let task_text = task.text.to_lowercase();

        if task.index == total_steps && !has_computation_cue(&task_text) {
            debug!(step = task.index, "terminal presentation step, no worker needed");
            return Ok(Selection::NoAgent);
        }

        let analysis_intent = self.request_has_analysis_intent(original_request);

        let mut candidates: Vec<&Arc<dyn Worker>> = Vec::new();
        for worker in self.registry.workers() {
            let descriptor = worker.descriptor();
            if !self.matches_task(&task_text, &descriptor.capabilities) {
                continue;
            }
            if is_analysis_class(&descriptor.capabilities) && !analysis_intent {
                debug!(
                    agent = %descriptor.name,
                    "excluded: analysis-class agent without analysis intent in request"
                );
                continue;
            }
            candidates.push(worker);
        }

        match candidates.first() {
            // Registration order is the stable tie-break.
            Some(worker) => {
                debug!(step = task.index, agent = %worker.descriptor().name, "agent selected");
                Ok(Selection::Agent(Arc::clone(worker)))
            }
            None => Err(SelectionError::NoAgentAvailable {
                step_index: task.index,
                task: task.text.clone(),
            }),
        }
    }

    fn request_has_analysis_intent(&self, original_request: &str) -> bool {
        let request = original_request.to_lowercase();
        self.analysis_keywords.iter().any(|k| request.contains(k))
    }

    fn matches_task(&self, task_text: &str, capabilities: &[String]) -> bool {
        capabilities.iter().any(|tag| {
            let tag = tag.to_lowercase();
            if WILDCARD_TAGS.contains(&tag.as_str()) {
                return true;
            }
            match self.cues.get(&tag) {
                Some(words) => words.iter().any(|w| task_text.contains(w.as_str())),
                // Unknown tag: the tag text itself is the cue.
                None => task_text.contains(&tag),
            }
        })
    }
}

fn is_analysis_class(capabilities: &[String]) -> bool {
    capabilities
        .iter()
        .any(|tag| ANALYSIS_CLASS_TAGS.contains(&tag.to_lowercase().as_str()))
}

fn has_computation_cue(task_text: &str) -> bool {
    COMPUTATION_CUES.iter().any(|cue| task_text.contains(cue))
}

fn builtin_cues() -> HashMap<String, Vec<String>> {
    let table: &[(&str, &[&str])] = &[
        (
            "computation",
            &["compute", "calculate", "evaluate", "solve", "sum", "count", "convert"],
        ),
        (
            "math",
            &["compute", "calculate", "solve", "sum", "multiply", "divide", "add", "subtract"],
        ),
        (
            "analysis",
            &["analyze", "analyse", "analysis", "trend", "statistic", "pattern", "insight"],
        ),
        (
            "data_analysis",
            &["analyze", "analyse", "analysis", "data", "trend", "statistic"],
        ),
        (
            "summarization",
            &["summarize", "summary", "condense", "digest"],
        ),
        ("reporting", &["report", "insight"]),
        (
            "research",
            &["research", "search", "find", "look up", "gather", "fetch", "information"],
        ),
        (
            "planning",
            &["plan", "schedule", "organize", "roadmap", "break down", "milestone"],
        ),
        (
            "writing",
            &["write", "draft", "compose", "document", "describe"],
        ),
        (
            "coding",
            &["code", "implement", "function", "script", "debug", "refactor"],
        ),
    ];

    table
        .iter()
        .map(|(tag, words)| {
            (
                (*tag).to_string(),
                words.iter().map(|w| (*w).to_string()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::{AgentDescriptor, AgentExecutionError};
    use crate::domain::context::ContextSnapshot;
    use async_trait::async_trait;

    struct StubWorker {
        descriptor: AgentDescriptor,
    }

    impl StubWorker {
        fn arc(name: &str, capabilities: &[&str]) -> Arc<dyn Worker> {
            Arc::new(Self {
                descriptor: AgentDescriptor::new(
                    name,
                    capabilities.iter().map(|c| (*c).to_string()).collect(),
                    format!("{name} stub"),
                ),
            })
        }
    }

    #[async_trait]
    impl Worker for StubWorker {
        fn descriptor(&self) -> &AgentDescriptor {
            &self.descriptor
        }

        async fn process(
            &self,
            _task: &str,
            _context: &ContextSnapshot,
        ) -> Result<String, AgentExecutionError> {
            Ok(String::new())
        }
    }

    fn registry(workers: Vec<Arc<dyn Worker>>) -> Arc<AgentRegistry> {
        let mut registry = AgentRegistry::new();
        for worker in workers {
            registry.register(worker).unwrap();
        }
        Arc::new(registry)
    }

    fn selector(workers: Vec<Arc<dyn Worker>>) -> AgentSelector {
        AgentSelector::new(registry(workers), &SelectionConfig::default())
    }

    #[test]
    fn worker_for_computation_and_no_agent_for_presentation() {
        let selector = selector(vec![StubWorker::arc("solver", &["math"])]);

        let step1 = TaskStep::new(1, "Compute 2+2");
        let step2 = TaskStep::new(2, "Present the final result");

        let first = selector.select(&step1, 2, "What is 2+2?").unwrap();
        assert_eq!(first.agent_name(), Some("solver"));

        let second = selector.select(&step2, 2, "What is 2+2?").unwrap();
        assert!(second.is_no_agent());
    }

    #[test]
    fn terminal_step_with_computation_cue_still_gets_a_worker() {
        let selector = selector(vec![StubWorker::arc("solver", &["math"])]);

        let step = TaskStep::new(2, "Calculate the final total");
        let selection = selector.select(&step, 2, "totals please").unwrap();
        assert_eq!(selection.agent_name(), Some("solver"));
    }

    #[test]
    fn analysis_agent_excluded_without_intent_in_request() {
        let selector = selector(vec![
            StubWorker::arc("analyst", &["analysis"]),
            StubWorker::arc("generalist", &["general_tasks"]),
        ]);

        // The subtask mentions analysis but the original request does not.
        let step = TaskStep::new(1, "Analyze the numbers");
        let selection = selector.select(&step, 2, "What is 2+2?").unwrap();
        assert_eq!(selection.agent_name(), Some("generalist"));
    }

    #[test]
    fn analysis_agent_selected_with_intent_in_request() {
        let selector = selector(vec![
            StubWorker::arc("analyst", &["analysis"]),
            StubWorker::arc("generalist", &["general_tasks"]),
        ]);

        let step = TaskStep::new(1, "Analyze sales figures for trends");
        let selection = selector
            .select(&step, 2, "Analyze sales trend and report insights")
            .unwrap();
        assert_eq!(selection.agent_name(), Some("analyst"));
    }

    #[test]
    fn registration_order_breaks_ties() {
        let selector = selector(vec![
            StubWorker::arc("first", &["general"]),
            StubWorker::arc("second", &["general"]),
        ]);

        let step = TaskStep::new(1, "Do something unspecific");
        let selection = selector.select(&step, 2, "do it").unwrap();
        assert_eq!(selection.agent_name(), Some("first"));
    }

    #[test]
    fn no_match_is_an_error_not_no_agent() {
        let selector = selector(vec![StubWorker::arc("coder", &["coding"])]);

        let step = TaskStep::new(1, "Water the plants");
        let err = selector.select(&step, 2, "garden care").unwrap_err();
        assert!(matches!(
            err,
            SelectionError::NoAgentAvailable { step_index: 1, .. }
        ));
    }

    #[test]
    fn unknown_tag_matches_on_tag_text() {
        let selector = selector(vec![StubWorker::arc("gardener", &["gardening"])]);

        let step = TaskStep::new(1, "Handle the gardening chores");
        let selection = selector.select(&step, 2, "help with the yard").unwrap();
        assert_eq!(selection.agent_name(), Some("gardener"));
    }

    #[test]
    fn configured_cues_extend_the_builtin_table() {
        let config = SelectionConfig {
            capability_cues: HashMap::from([(
                "gardening".to_string(),
                vec!["water".to_string(), "prune".to_string()],
            )]),
            ..SelectionConfig::default()
        };
        let selector = AgentSelector::new(
            registry(vec![StubWorker::arc("gardener", &["gardening"])]),
            &config,
        );

        let step = TaskStep::new(1, "Water the plants");
        let selection = selector.select(&step, 2, "garden care").unwrap();
        assert_eq!(selection.agent_name(), Some("gardener"));
    }
}
