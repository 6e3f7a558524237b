// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Per-run context store.
//
// One store per workflow run, owned exclusively by that run's sequencer.
// Entries are single-assignment: each step index is written at most once,
// and earlier entries are never mutated or rolled back.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output recorded for one executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// 1-based index of the step that produced this value.
    pub step_index: usize,

    /// Step output, stored verbatim.
    pub value: String,
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("context entry for step {0} was already written")]
    DuplicateWrite(usize),
}

/// Ordered record of step outputs for a single run.
///
/// Writes happen strictly in program order before any read that could
/// reference them, so no interior locking is needed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextStore {
    entries: Vec<ContextEntry>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a step's output. Fails if an entry for the index already exists.
    pub fn write(&mut self, step_index: usize, value: String) -> Result<(), ContextError> {
        if self.entries.iter().any(|e| e.step_index == step_index) {
            return Err(ContextError::DuplicateWrite(step_index));
        }
        self.entries.push(ContextEntry { step_index, value });
        Ok(())
    }

    /// Look up the stored output for a step index.
    pub fn get(&self, step_index: usize) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.step_index == step_index)
            .map(|e| e.value.as_str())
    }

    pub fn contains(&self, step_index: usize) -> bool {
        self.entries.iter().any(|e| e.step_index == step_index)
    }

    /// Most recently written entry, if any.
    pub fn last(&self) -> Option<&ContextEntry> {
        self.entries.last()
    }

    /// Highest step index written so far.
    pub fn last_index(&self) -> Option<usize> {
        self.entries.iter().map(|e| e.step_index).max()
    }

    /// Entries in write order.
    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Immutable copy of the context so far, handed to workers.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            entries: self.entries.clone(),
        }
    }
}

/// Point-in-time view of a run's context, passed to worker invocations.
///
/// Retries of the same step receive the same snapshot, so a worker sees
/// identical inputs on every attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextSnapshot {
    entries: Vec<ContextEntry>,
}

impl ContextSnapshot {
    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn get(&self, step_index: usize) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.step_index == step_index)
            .map(|e| e.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render entries as prompt-friendly lines, one per step.
    pub fn rendered(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("step {}: {}", e.step_index, e.value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_get() {
        let mut store = ContextStore::new();
        store.write(1, "alpha".to_string()).unwrap();
        store.write(2, "beta".to_string()).unwrap();

        assert_eq!(store.get(1), Some("alpha"));
        assert_eq!(store.get(2), Some("beta"));
        assert_eq!(store.get(3), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn duplicate_write_rejected() {
        let mut store = ContextStore::new();
        store.write(1, "first".to_string()).unwrap();

        let err = store.write(1, "second".to_string()).unwrap_err();
        assert!(matches!(err, ContextError::DuplicateWrite(1)));

        // Original value is untouched.
        assert_eq!(store.get(1), Some("first"));
    }

    #[test]
    fn last_entry_and_index() {
        let mut store = ContextStore::new();
        assert!(store.last().is_none());
        assert!(store.last_index().is_none());

        store.write(1, "a".to_string()).unwrap();
        store.write(2, "b".to_string()).unwrap();

        assert_eq!(store.last().unwrap().value, "b");
        assert_eq!(store.last_index(), Some(2));
    }

    #[test]
    fn snapshot_is_detached() {
        let mut store = ContextStore::new();
        store.write(1, "a".to_string()).unwrap();

        let snapshot = store.snapshot();
        store.write(2, "b".to_string()).unwrap();

        assert_eq!(snapshot.entries().len(), 1);
        assert_eq!(snapshot.get(1), Some("a"));
        assert_eq!(snapshot.get(2), None);
    }

    #[test]
    fn snapshot_rendering() {
        let mut store = ContextStore::new();
        store.write(1, "loaded 10 rows".to_string()).unwrap();
        store.write(2, "3 outliers".to_string()).unwrap();

        let rendered = store.snapshot().rendered();
        assert_eq!(rendered, "step 1: loaded 10 rows\nstep 2: 3 outliers");
    }
}
