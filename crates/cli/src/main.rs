// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ham: build recipes on disposable cloud servers

mod commands;
mod config;
mod env;
mod exit_error;

use anyhow::Result;
use clap::{Parser, Subcommand};
use exit_error::ExitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "ham", version = env::VERSION, about = "Remote build orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a recipe on a cloud server and follow it to completion
    Get(commands::get::GetArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_new(env::log_filter())
        .unwrap_or_else(|_| EnvFilter::new(env::DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Get(args) => commands::get::get(args).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(err) = run(cli).await {
        let code = err.downcast_ref::<ExitError>().map_or(1, |e| e.code);
        eprintln!("error: {err:#}");
        std::process::exit(code);
    }
}
