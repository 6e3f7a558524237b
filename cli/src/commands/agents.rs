// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! `relay agents` - list the configured agent catalog.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use relay_core::domain::config::RouterConfigManifest;

pub fn execute(config_path: Option<PathBuf>) -> Result<ExitCode> {
    let manifest = RouterConfigManifest::load(config_path)?;
    manifest.validate()?;

    println!("{}", "Configured agents:".bold());
    for agent in &manifest.spec.agents {
        println!(
            "  {} [{}] - {}",
            agent.name.cyan(),
            agent.capabilities.join(", "),
            agent.description
        );
    }

    if !manifest.spec.workflow.agents.is_empty() {
        println!(
            "\nWorkflow '{}' order: {}",
            manifest.spec.workflow.name,
            manifest.spec.workflow.agents.join(" -> ")
        );
    }

    Ok(ExitCode::SUCCESS)
}
