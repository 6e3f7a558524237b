// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Sequencer Application Service
//!
//! Drives one workflow run through its task list: resolves placeholders,
//! selects a worker per step, invokes it under the retry/timeout policy and
//! records outputs in the run's context store.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Per-run execution state machine
//! - **Dependencies:** Domain (run, placeholder, agent), Selector
//!
//! # State machine
//!
//! ```text
//! Pending -> Running -> { Completed | StepFailed | Aborted }
//! ```
//!
//! Failure semantics are local-then-surface: retries happen silently inside
//! the sequencer; once exhausted, the failure is recorded on the run and
//! surfaced, never swallowed. Earlier context entries are never rolled back.
//! Cancellation is cooperative and checked only at step boundaries: an
//! in-flight worker call is never interrupted mid-call.

use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::selector::AgentSelector;
use crate::domain::agent::{AgentExecutionError, Selection, Worker};
use crate::domain::config::EngineConfig;
use crate::domain::placeholder;
use crate::domain::run::{RunError, TaskStep, WorkflowRun};
use crate::domain::workflow::WorkflowDefinition;

/// Pre-flight rejection: the decomposition exceeds the configured ceiling.
///
/// Checked before any worker is invoked; a rejected run ends `Aborted` with
/// zero side effects.
#[derive(Debug, Error)]
#[error("workflow too large: {steps} steps exceeds ceiling of {max_steps}")]
pub struct WorkflowTooLarge {
    pub steps: usize,
    pub max_steps: usize,
}

/// Limits governing one run's execution.
#[derive(Debug, Clone)]
pub struct ExecutionLimits {
    /// Ceiling on decomposed step count, checked pre-flight.
    pub max_steps: usize,

    /// Total attempts per worker invocation (first try included).
    pub retry_attempts: u32,

    /// Base delay between attempts; doubles per retry.
    pub retry_delay: Duration,

    /// Per-call timeout for one worker invocation.
    pub step_timeout: Duration,

    /// Whole-run timeout, checked at step boundaries.
    pub run_timeout: Duration,
}

impl ExecutionLimits {
    pub fn from_config(engine: &EngineConfig, workflow: &WorkflowDefinition) -> Self {
        Self {
            max_steps: workflow.max_steps,
            retry_attempts: engine.retry_attempts.max(1),
            retry_delay: Duration::from_millis(engine.retry_delay_ms),
            step_timeout: Duration::from_secs(engine.step_timeout_seconds),
            run_timeout: workflow.timeout(),
        }
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default(), &WorkflowDefinition::default())
    }
}

/// Application service executing one run at a time, strictly sequentially.
pub struct Sequencer {
    selector: AgentSelector,
    limits: ExecutionLimits,
}

impl Sequencer {
    pub fn new(selector: AgentSelector, limits: ExecutionLimits) -> Self {
        Self { selector, limits }
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Execute a decomposed task sequence to a terminal run state.
    ///
    /// The returned run is always terminal; step failures and aborts are
    /// encoded in its status rather than an `Err`. `Err` is reserved for
    /// structurally invalid step lists (non-contiguous indices), which the
    /// decomposer already guards against.
    pub async fn execute(
        &self,
        request: &str,
        steps: Vec<TaskStep>,
        cancel: &CancellationToken,
    ) -> Result<WorkflowRun, RunError> {
        let mut run = WorkflowRun::new(request, steps)?;
        let started = Instant::now();
        let total_steps = run.steps().len();

        // Pre-flight ceiling check: zero side effects on rejection.
        if total_steps > self.limits.max_steps {
            let reason = WorkflowTooLarge {
                steps: total_steps,
                max_steps: self.limits.max_steps,
            };
            warn!(run_id = %run.id, %reason, "run rejected pre-flight");
            run.abort(reason.to_string())?;
            counter!("relay_runs_aborted_total").increment(1);
            return Ok(run);
        }

        run.start()?;
        info!(run_id = %run.id, steps = total_steps, "run started");

        let steps: Vec<TaskStep> = run.steps().to_vec();
        for step in &steps {
            // (a) Resolve placeholders against the context so far. Resolver
            // failures are structural: no retry.
            let resolved = match placeholder::resolve(&step.text, step.index, run.context()) {
                Ok(resolved) => resolved,
                Err(err) => {
                    warn!(run_id = %run.id, step = step.index, %err, "placeholder resolution failed");
                    run.fail_step(step.index, err.to_string())?;
                    counter!("relay_runs_failed_total").increment(1);
                    return Ok(run);
                }
            };

            // (b) Cooperative cancellation and run timeout, checked at the
            // step boundary only.
            if cancel.is_cancelled() {
                info!(run_id = %run.id, step = step.index, "cancellation requested");
                run.abort(format!("cancelled before step {}", step.index))?;
                counter!("relay_runs_aborted_total").increment(1);
                return Ok(run);
            }
            if started.elapsed() >= self.limits.run_timeout {
                warn!(run_id = %run.id, step = step.index, "run timeout exceeded");
                run.abort(format!(
                    "run timeout of {:?} exceeded before step {}",
                    self.limits.run_timeout, step.index
                ))?;
                counter!("relay_runs_aborted_total").increment(1);
                return Ok(run);
            }

            // (c) Select a worker, or propagate the prior output.
            let selection = match self.selector.select(step, total_steps, request) {
                Ok(selection) => selection,
                Err(err) => {
                    warn!(run_id = %run.id, step = step.index, %err, "agent selection failed");
                    run.fail_step(step.index, err.to_string())?;
                    counter!("relay_runs_failed_total").increment(1);
                    return Ok(run);
                }
            };

            let worker = match selection {
                Selection::NoAgent => {
                    // Pass-through: copy the most recent prior output, or the
                    // resolved text itself when there is no prior output.
                    let value = run
                        .context()
                        .last()
                        .map(|entry| entry.value.clone())
                        .unwrap_or_else(|| resolved.clone());
                    debug!(run_id = %run.id, step = step.index, "pass-through step");
                    if let Err(err) = run.record_output(step.index, value) {
                        run.fail_step(step.index, err.to_string())?;
                        counter!("relay_runs_failed_total").increment(1);
                        return Ok(run);
                    }
                    continue;
                }
                Selection::Agent(worker) => worker,
            };

            // (d)+(e) Invoke with the retry policy; identical inputs each
            // attempt.
            match self.invoke_with_retry(&mut run, step, &resolved, worker.as_ref()).await {
                Ok(value) => {
                    if let Err(err) = run.record_output(step.index, value) {
                        run.fail_step(step.index, err.to_string())?;
                        counter!("relay_runs_failed_total").increment(1);
                        return Ok(run);
                    }
                    counter!("relay_steps_executed_total").increment(1);
                }
                Err(err) => {
                    run.fail_step(step.index, err.to_string())?;
                    counter!("relay_runs_failed_total").increment(1);
                    return Ok(run);
                }
            }
        }

        run.complete()?;
        info!(run_id = %run.id, "run completed");
        counter!("relay_runs_completed_total").increment(1);
        Ok(run)
    }

    /// One step's invocation loop: up to `retry_attempts` total attempts,
    /// exponential backoff between them, permanent failures short-circuit.
    async fn invoke_with_retry(
        &self,
        run: &mut WorkflowRun,
        step: &TaskStep,
        resolved: &str,
        worker: &dyn Worker,
    ) -> Result<String, AgentExecutionError> {
        let agent = worker.descriptor().name.clone();
        let snapshot = run.context().snapshot();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let outcome =
                match tokio::time::timeout(self.limits.step_timeout, worker.process(resolved, &snapshot))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(AgentExecutionError::timed_out(
                        agent.clone(),
                        self.limits.step_timeout,
                    )),
                };

            match outcome {
                Ok(value) => {
                    run.log_attempt(step.index, attempt, None);
                    return Ok(value);
                }
                Err(err) => {
                    run.log_attempt(step.index, attempt, Some(err.to_string()));
                    counter!("relay_step_attempts_failed_total").increment(1);

                    if err.permanent {
                        warn!(step = step.index, %agent, %err, "permanent failure, not retrying");
                        return Err(err);
                    }
                    if attempt >= self.limits.retry_attempts {
                        warn!(step = step.index, %agent, %err, attempts = attempt, "retry attempts exhausted");
                        return Err(err);
                    }

                    let delay = self.limits.retry_delay * 2_u32.pow(attempt - 1);
                    warn!(
                        step = step.index,
                        %agent,
                        %err,
                        attempt,
                        ?delay,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
