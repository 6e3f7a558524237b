// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Router Application Service
//!
//! The orchestrating facade: decomposes a request, acquires an admission
//! slot, executes the run through the sequencer and aggregates the outcome.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Request -> FinalResult pipeline
//! - **Dependencies:** Decomposer, AdmissionController, Sequencer, Aggregator
//!
//! A failed or aborted run is not an `Err`: it surfaces as
//! `FinalResult::Partial` carrying the completed-step prefix and the
//! recorded reason. `Err` covers failures before a run exists
//! (decomposition, admission) and internal invariant breaches.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::application::admission::{AdmissionController, AdmissionError};
use crate::application::aggregator::{aggregate, FinalResult};
use crate::application::decomposer::{Decomposer, DecompositionError};
use crate::application::sequencer::Sequencer;
use crate::domain::agent::AgentRegistry;
use crate::domain::run::RunError;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Decomposition(#[from] DecompositionError),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Run(#[from] RunError),
}

/// Top-level router service for one process.
pub struct Router {
    registry: Arc<AgentRegistry>,
    decomposer: Decomposer,
    sequencer: Sequencer,
    admission: AdmissionController,
}

impl Router {
    pub fn new(
        registry: Arc<AgentRegistry>,
        decomposer: Decomposer,
        sequencer: Sequencer,
        admission: AdmissionController,
    ) -> Self {
        Self {
            registry,
            decomposer,
            sequencer,
            admission,
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Handle one user request end to end.
    #[instrument(skip(self, cancel), fields(request_len = request.len()))]
    pub async fn handle(
        &self,
        request: &str,
        cancel: &CancellationToken,
    ) -> Result<FinalResult, RouterError> {
        let steps = self
            .decomposer
            .decompose(request, &self.registry.descriptors())
            .await?;
        info!(steps = steps.len(), "request decomposed");

        // Slot is held for the whole run and released on drop.
        let _permit = self.admission.admit().await?;

        let run = self.sequencer.execute(request, steps, cancel).await?;
        info!(run_id = %run.id, status = %run.status(), "run finished");

        Ok(aggregate(&run))
    }
}
