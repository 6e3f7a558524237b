// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Aggregator Application Service
//!
//! Produces the final answer, or a best-effort partial composite, from a
//! terminal run. A failed or aborted run still yields every completed entry
//! in index order plus the recorded reason; callers decide whether a
//! partial result is acceptable.

use serde::{Deserialize, Serialize};

use crate::domain::run::{RunStatus, WorkflowRun};

/// One completed step paired with its recorded output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutput {
    pub index: usize,
    pub task: String,
    pub output: String,
}

/// Final outcome of a run, as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalResult {
    /// All steps completed; `answer` is the last step's context entry.
    Complete {
        answer: String,
        steps: Vec<StepOutput>,
    },

    /// The run failed or aborted; `completed` holds every entry written
    /// before the stop, in index order.
    Partial {
        completed: Vec<StepOutput>,
        reason: String,
    },
}

impl FinalResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, FinalResult::Complete { .. })
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            FinalResult::Complete { answer, .. } => Some(answer.as_str()),
            FinalResult::Partial { .. } => None,
        }
    }

    pub fn steps(&self) -> &[StepOutput] {
        match self {
            FinalResult::Complete { steps, .. } => steps,
            FinalResult::Partial { completed, .. } => completed,
        }
    }

    /// Human-readable execution summary.
    pub fn render(&self) -> String {
        let mut out = String::from("## Task Execution Summary\n\n");

        for step in self.steps() {
            out.push_str(&format!("### Step {}: {}\n", step.index, step.task));
            out.push_str(&format!("Result: {}\n\n", step.output));
        }

        match self {
            FinalResult::Complete { answer, steps } => {
                out.push_str(&format!("Total steps completed: {}\n", steps.len()));
                out.push_str(&format!("\nFinal answer:\n{answer}\n"));
            }
            FinalResult::Partial { completed, reason } => {
                out.push_str(&format!(
                    "Run stopped after {} completed step(s): {}\n",
                    completed.len(),
                    reason
                ));
            }
        }

        out
    }
}

/// Assemble the final result from a terminal run.
pub fn aggregate(run: &WorkflowRun) -> FinalResult {
    let outputs: Vec<StepOutput> = run
        .steps()
        .iter()
        .filter_map(|step| {
            run.context().get(step.index).map(|output| StepOutput {
                index: step.index,
                task: step.text.clone(),
                output: output.to_string(),
            })
        })
        .collect();

    match run.status() {
        RunStatus::Completed => {
            let answer = outputs
                .last()
                .map(|s| s.output.clone())
                .unwrap_or_default();
            FinalResult::Complete {
                answer,
                steps: outputs,
            }
        }
        status => {
            let reason = run
                .last_error()
                .map(str::to_string)
                .unwrap_or_else(|| format!("run ended in status {status}"));
            FinalResult::Partial {
                completed: outputs,
                reason,
            }
        }
    }
}
