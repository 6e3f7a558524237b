// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Router Bootstrap
//!
//! Wires a validated configuration manifest into a ready [`Router`]:
//! provider registry, agent registry, decomposer, selector, sequencer and
//! admission controller. Process-wide state is initialized once here and
//! passed explicitly by reference, so every service can be tested with
//! substitute registries and backends.

use std::sync::Arc;

use tracing::info;

use crate::application::admission::AdmissionController;
use crate::application::decomposer::Decomposer;
use crate::application::router::Router;
use crate::application::selector::AgentSelector;
use crate::application::sequencer::{ExecutionLimits, Sequencer};
use crate::domain::completion::SamplingParams;
use crate::domain::config::RouterConfigManifest;
use crate::infrastructure::agents;
use crate::infrastructure::llm::ProviderRegistry;

/// Build a [`Router`] from a validated configuration manifest.
pub fn build_router(manifest: &RouterConfigManifest) -> anyhow::Result<Router> {
    manifest.validate()?;
    let spec = &manifest.spec;

    let providers = ProviderRegistry::from_config(&spec.providers)?;

    let router_client = providers
        .default_provider(spec.engine.router_provider.as_deref())
        .ok_or_else(|| anyhow::anyhow!("no completion provider available for the decomposer"))?;

    let registry = Arc::new(agents::build_registry(spec, &providers)?);

    let decomposer = Decomposer::new(router_client, SamplingParams::default());
    let selector = AgentSelector::new(Arc::clone(&registry), &spec.selection);
    let sequencer = Sequencer::new(
        selector,
        ExecutionLimits::from_config(&spec.engine, &spec.workflow),
    );
    let admission = AdmissionController::new(spec.engine.max_concurrent_runs);

    info!(
        router = %manifest.metadata.name,
        agents = registry.len(),
        providers = providers.names().len(),
        max_concurrent_runs = spec.engine.max_concurrent_runs,
        "router assembled"
    );

    Ok(Router::new(registry, decomposer, sequencer, admission))
}

/// Build just the provider registry (used by health checks).
pub fn build_providers(manifest: &RouterConfigManifest) -> anyhow::Result<ProviderRegistry> {
    ProviderRegistry::from_config(&manifest.spec.providers)
}
