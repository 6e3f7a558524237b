// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! RELAY orchestrator CLI.
//!
//! Thin entrypoint over the core router: decompose a request, run it
//! through the agent pipeline, print per-step outputs and the final
//! answer. A failed or aborted run exits non-zero but still prints the
//! best-effort partial composite.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "relay",
    version,
    about = "100monkeys.ai RELAY - sequential task router for LLM agent pipelines"
)]
struct Cli {
    /// Path to the router configuration manifest (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose and execute a request through the agent pipeline
    Run {
        /// The request text
        request: String,
    },

    /// List the configured agents
    Agents,

    /// Check completion provider health
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional; ignore absence.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Run { request } => commands::run::execute(cli.config, &request).await,
        Commands::Agents => commands::agents::execute(cli.config),
        Commands::Health => commands::health::execute(cli.config).await,
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
