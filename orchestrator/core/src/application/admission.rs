// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Run Admission Controller
//!
//! Bounds how many runs execute concurrently. A run requesting a slot
//! beyond the ceiling blocks until one is released rather than being
//! rejected outright. Permits are RAII: dropping a [`RunPermit`] frees the
//! slot.

use std::sync::Arc;

use metrics::gauge;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("run admission controller is closed")]
    Closed,
}

/// Slot held for the duration of one run.
pub struct RunPermit {
    _permit: OwnedSemaphorePermit,
    active: Arc<Mutex<usize>>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        let mut active = self.active.lock();
        *active = active.saturating_sub(1);
        gauge!("relay_runs_active").set(*active as f64);
    }
}

/// Admission-control semaphore over concurrently executing runs.
#[derive(Clone)]
pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    ceiling: usize,
    active: Arc<Mutex<usize>>,
}

impl AdmissionController {
    pub fn new(max_concurrent_runs: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent_runs)),
            ceiling: max_concurrent_runs,
            active: Arc::new(Mutex::new(0)),
        }
    }

    /// Wait for a run slot. Blocks (asynchronously) while the ceiling is
    /// reached; never rejects.
    pub async fn admit(&self) -> Result<RunPermit, AdmissionError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| AdmissionError::Closed)?;

        let mut active = self.active.lock();
        *active += 1;
        gauge!("relay_runs_active").set(*active as f64);
        debug!(active = *active, ceiling = self.ceiling, "run admitted");

        Ok(RunPermit {
            _permit: permit,
            active: Arc::clone(&self.active),
        })
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Currently admitted runs.
    pub fn active(&self) -> usize {
        *self.active.lock()
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
