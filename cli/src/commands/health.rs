// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! `relay health` - probe completion provider reachability.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use relay_core::domain::config::RouterConfigManifest;
use relay_core::infrastructure::bootstrap;

pub async fn execute(config_path: Option<PathBuf>) -> Result<ExitCode> {
    let manifest = RouterConfigManifest::load(config_path)?;
    let providers = bootstrap::build_providers(&manifest)?;

    let results = providers.health_check_all().await;
    let mut all_healthy = true;

    for name in providers.names() {
        match results.get(name) {
            Some(Ok(())) => println!("  {} {}", "ok".green(), name),
            Some(Err(err)) => {
                all_healthy = false;
                println!("  {} {} - {}", "fail".red(), name, err);
            }
            None => {}
        }
    }

    Ok(if all_healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
