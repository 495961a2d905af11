// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! `reasonchip run`: execute a workflow in-process via [`LocalRunner`]
//! — no broker, no worker, no wire protocol.

use anyhow::Result;
use clap::Args;

use crate::exit_code::ExitCode;
use crate::runner::LocalRunner;
use crate::variables;

#[derive(Args)]
pub struct RunArgs {
    /// Dotted workflow name to run, e.g. `demo.hello`
    pub workflow: String,

    /// Register a workflow collection as `name=path` (only `demo=...`
    /// is recognized; dynamic module loading is out of scope)
    #[arg(long = "collection", value_name = "NAME=PATH")]
    pub collections: Vec<String>,

    /// JSON file to deep-merge into the run's variables, in order
    #[arg(long = "vars", value_name = "FILE")]
    pub vars: Vec<String>,

    /// Override a single variable as `key=value` (a JSON value if it
    /// parses as one, a string otherwise), applied after `--vars`
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

pub async fn handle(args: RunArgs) -> Result<ExitCode> {
    let registry = match super::resolve_registry(&args.collections) {
        Ok(registry) => registry,
        Err(code) => return Ok(code),
    };

    let variables = variables::assemble(&args.vars, &args.set)?;

    let runner = LocalRunner::new(registry);
    match runner.run(&args.workflow, variables).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::Ok)
        }
        Err(err) => {
            eprintln!("error: {err}");
            Ok(ExitCode::Error)
        }
    }
}
