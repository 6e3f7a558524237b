// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! `relay run` - execute one request through the router.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use relay_core::application::aggregator::FinalResult;
use relay_core::domain::config::RouterConfigManifest;
use relay_core::infrastructure::bootstrap;

pub async fn execute(config_path: Option<PathBuf>, request: &str) -> Result<ExitCode> {
    let manifest = RouterConfigManifest::load(config_path)?;
    let router = bootstrap::build_router(&manifest)?;

    // Ctrl-C cancels cooperatively: the current step finishes, the next
    // never starts.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, cancelling run");
                cancel.cancel();
            }
        });
    }

    println!("{}", "Processing request...".dimmed());
    let result = router.handle(request, &cancel).await?;

    for step in result.steps() {
        println!("{} {}", format!("[step {}]", step.index).cyan(), step.task);
        println!("  {}", step.output);
    }

    match &result {
        FinalResult::Complete { answer, .. } => {
            println!("\n{}", "Final answer:".green().bold());
            println!("{answer}");
            Ok(ExitCode::SUCCESS)
        }
        FinalResult::Partial { completed, reason } => {
            eprintln!(
                "\n{} {}",
                "Run did not complete:".red().bold(),
                reason
            );
            eprintln!("{} step(s) finished before the stop.", completed.len());
            Ok(ExitCode::FAILURE)
        }
    }
}
