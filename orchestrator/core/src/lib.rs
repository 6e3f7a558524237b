// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! RELAY orchestrator core.
//!
//! Decomposes a free-text request into an ordered sequence of dependent
//! subtasks, routes each subtask to a capability-matched worker, executes
//! the sequence propagating intermediate outputs through `step_N_output`
//! placeholders, and assembles the final answer. Admission control bounds
//! how many runs execute concurrently.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
