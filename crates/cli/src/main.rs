// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `reasonchip`: the distribution's single binary, bundling the
//! embedded runner, the broker-attached worker, the bus-attached
//! worker, and a one-shot dispatcher behind one `clap` command tree.

mod commands;
mod exit_code;
mod registry;
mod runner;
mod signals;
mod tls_args;
mod variables;

use clap::{Parser, Subcommand};

use exit_code::ExitCode;

#[derive(Parser)]
#[command(name = "reasonchip", version, about = "ReasonChip workflow execution")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a workflow in-process, no broker involved
    Run(commands::run::RunArgs),
    /// Connect to a broker and execute workflows it routes here
    Worker(commands::worker::WorkerArgs),
    /// Consume workflows from an AMQP queue instead of a broker
    Serve(commands::serve::ServeArgs),
    /// Dispatch one workflow run to a broker or bus and print the result
    Dispatch(commands::dispatch::DispatchArgs),
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Run(args) => commands::run::handle(args).await,
        Command::Worker(args) => commands::worker::handle(args).await,
        Command::Serve(args) => commands::serve::handle(args).await,
        Command::Dispatch(args) => commands::dispatch::handle(args).await,
    };

    let code = match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::Error
        }
    };

    std::process::ExitCode::from(code.code() as u8)
}
