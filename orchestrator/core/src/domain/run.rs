// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workflow Run Domain Model
//!
//! A run is one end-to-end execution of a decomposed task sequence for a
//! single user request. The run aggregate owns its task list, its context
//! store and its attempt log, and enforces the status state machine.
//!
//! # Invariants
//!
//! 1. Step indices are exactly `1..=N` with no gaps (checked at construction).
//! 2. Status transitions are monotone: `Pending -> Running -> {Completed |
//!    StepFailed | Aborted}`; no transition leaves a terminal state.
//! 3. Each context entry is written at most once (delegated to the store).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::context::{ContextError, ContextStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One subtask within a run. Created once by the decomposer, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStep {
    /// 1-based position within the run.
    pub index: usize,

    /// Task text, possibly containing `step_N_output` placeholders.
    pub text: String,
}

impl TaskStep {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    StepFailed,
    Aborted,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::StepFailed | RunStatus::Aborted
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::StepFailed => "step-failed",
            RunStatus::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}

/// One recorded worker invocation attempt.
///
/// The log exists so attempt counts are observable from the outside without
/// instrumenting workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAttempt {
    pub step_index: usize,

    /// 1-based attempt number within the step.
    pub attempt: u32,

    /// Failure message, `None` for the successful attempt.
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("step indices must be contiguous from 1: expected {expected}, found {found}")]
    NonContiguousSteps { expected: usize, found: usize },

    #[error("run has no steps")]
    EmptySteps,

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: RunStatus, to: RunStatus },
}

/// Aggregate root for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: RunId,

    /// Original user request, verbatim. Selection policy consults this, not
    /// the per-step text, for intent cues.
    pub request: String,

    steps: Vec<TaskStep>,
    status: RunStatus,
    context: ContextStore,
    attempt_log: Vec<StepAttempt>,

    /// Index of the step the run failed or aborted on, if any.
    failed_step: Option<usize>,

    /// Terminal failure or abort reason, if any.
    last_error: Option<String>,

    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    /// Create a pending run, validating step-index contiguity.
    pub fn new(request: impl Into<String>, steps: Vec<TaskStep>) -> Result<Self, RunError> {
        if steps.is_empty() {
            return Err(RunError::EmptySteps);
        }
        for (position, step) in steps.iter().enumerate() {
            let expected = position + 1;
            if step.index != expected {
                return Err(RunError::NonContiguousSteps {
                    expected,
                    found: step.index,
                });
            }
        }

        Ok(Self {
            id: RunId::new(),
            request: request.into(),
            steps,
            status: RunStatus::Pending,
            context: ContextStore::new(),
            attempt_log: Vec::new(),
            failed_step: None,
            last_error: None,
            started_at: Utc::now(),
            ended_at: None,
        })
    }

    pub fn steps(&self) -> &[TaskStep] {
        &self.steps
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    /// Highest step index with a recorded output.
    pub fn completed_through(&self) -> Option<usize> {
        self.context.last_index()
    }

    pub fn attempt_log(&self) -> &[StepAttempt] {
        &self.attempt_log
    }

    /// Number of logged worker invocation attempts for one step.
    pub fn attempts_for(&self, step_index: usize) -> u32 {
        self.attempt_log
            .iter()
            .filter(|a| a.step_index == step_index)
            .count() as u32
    }

    pub fn failed_step(&self) -> Option<usize> {
        self.failed_step
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Transition `Pending -> Running`.
    pub fn start(&mut self) -> Result<(), RunError> {
        self.transition(RunStatus::Running)
    }

    /// Transition to `Completed` after all steps produced an output.
    pub fn complete(&mut self) -> Result<(), RunError> {
        self.transition(RunStatus::Completed)?;
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    /// Record a step failure and transition to `StepFailed`.
    pub fn fail_step(&mut self, step_index: usize, error: impl Into<String>) -> Result<(), RunError> {
        self.transition(RunStatus::StepFailed)?;
        self.failed_step = Some(step_index);
        self.last_error = Some(error.into());
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    /// Abort the run (cancellation, run timeout, or pre-flight rejection).
    ///
    /// Allowed from `Pending` as well as `Running`: a pre-flight rejection
    /// aborts before execution starts, with zero side effects.
    pub fn abort(&mut self, reason: impl Into<String>) -> Result<(), RunError> {
        self.transition(RunStatus::Aborted)?;
        self.last_error = Some(reason.into());
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    /// Record one step's output in the context store.
    pub fn record_output(&mut self, step_index: usize, value: String) -> Result<(), ContextError> {
        self.context.write(step_index, value)
    }

    /// Append a worker invocation attempt to the log.
    pub fn log_attempt(&mut self, step_index: usize, attempt: u32, error: Option<String>) {
        self.attempt_log.push(StepAttempt {
            step_index,
            attempt,
            error,
        });
    }

    fn transition(&mut self, to: RunStatus) -> Result<(), RunError> {
        let from = self.status;
        let allowed = match (from, to) {
            (RunStatus::Pending, RunStatus::Running) => true,
            (RunStatus::Pending, RunStatus::Aborted) => true,
            (RunStatus::Running, RunStatus::Completed) => true,
            (RunStatus::Running, RunStatus::StepFailed) => true,
            (RunStatus::Running, RunStatus::Aborted) => true,
            _ => false,
        };
        if !allowed {
            return Err(RunError::InvalidTransition { from, to });
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(texts: &[&str]) -> Vec<TaskStep> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| TaskStep::new(i + 1, *t))
            .collect()
    }

    #[test]
    fn rejects_empty_step_list() {
        let err = WorkflowRun::new("req", vec![]).unwrap_err();
        assert!(matches!(err, RunError::EmptySteps));
    }

    #[test]
    fn rejects_non_contiguous_indices() {
        let bad = vec![TaskStep::new(1, "a"), TaskStep::new(3, "b")];
        let err = WorkflowRun::new("req", bad).unwrap_err();
        assert!(matches!(
            err,
            RunError::NonContiguousSteps {
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn rejects_indices_not_starting_at_one() {
        let bad = vec![TaskStep::new(2, "a")];
        assert!(WorkflowRun::new("req", bad).is_err());
    }

    #[test]
    fn status_progresses_monotonically() {
        let mut run = WorkflowRun::new("req", steps(&["a"])).unwrap();
        assert_eq!(run.status(), RunStatus::Pending);

        run.start().unwrap();
        assert_eq!(run.status(), RunStatus::Running);

        run.complete().unwrap();
        assert_eq!(run.status(), RunStatus::Completed);
        assert!(run.ended_at.is_some());
    }

    #[test]
    fn terminal_states_cannot_transition() {
        let mut run = WorkflowRun::new("req", steps(&["a"])).unwrap();
        run.start().unwrap();
        run.fail_step(1, "boom").unwrap();

        assert!(run.complete().is_err());
        assert!(run.abort("late").is_err());
        assert!(run.start().is_err());
        assert_eq!(run.status(), RunStatus::StepFailed);
        assert_eq!(run.failed_step(), Some(1));
        assert_eq!(run.last_error(), Some("boom"));
    }

    #[test]
    fn abort_is_allowed_before_start() {
        let mut run = WorkflowRun::new("req", steps(&["a", "b", "c"])).unwrap();
        run.abort("too large").unwrap();
        assert_eq!(run.status(), RunStatus::Aborted);
        assert!(run.context().is_empty());
        assert!(run.attempt_log().is_empty());
    }

    #[test]
    fn completed_steps_cannot_double_start() {
        let mut run = WorkflowRun::new("req", steps(&["a"])).unwrap();
        run.start().unwrap();
        assert!(run.start().is_err());
    }

    #[test]
    fn attempt_log_counts_per_step() {
        let mut run = WorkflowRun::new("req", steps(&["a", "b"])).unwrap();
        run.log_attempt(1, 1, Some("transient".into()));
        run.log_attempt(1, 2, None);
        run.log_attempt(2, 1, None);

        assert_eq!(run.attempts_for(1), 2);
        assert_eq!(run.attempts_for(2), 1);
        assert_eq!(run.attempt_log().len(), 3);
    }

    #[test]
    fn completed_through_follows_context() {
        let mut run = WorkflowRun::new("req", steps(&["a", "b"])).unwrap();
        assert_eq!(run.completed_through(), None);

        run.record_output(1, "one".into()).unwrap();
        assert_eq!(run.completed_through(), Some(1));

        run.record_output(2, "two".into()).unwrap();
        assert_eq!(run.completed_through(), Some(2));
    }
}
