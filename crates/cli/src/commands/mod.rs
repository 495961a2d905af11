// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! CLI command implementations.

pub mod dispatch;
pub mod run;
pub mod serve;
pub mod worker;

use reasonchip_engine::WorkflowRegistry;

use crate::exit_code::ExitCode;
use crate::registry::{demo_registry, DEMO_COLLECTION};

/// Build the workflow registry a `--collection` flag set asks for.
/// Dynamic module loading is out of scope: the only name this
/// resolves is the literal `demo`, whose workflows are compiled into
/// this binary. Anything else is a configuration problem, not a missing
/// file on disk.
pub fn resolve_registry(collections: &[String]) -> Result<WorkflowRegistry, ExitCode> {
    for token in collections {
        let Some((name, _path)) = token.split_once('=') else {
            tracing::error!(token, "malformed --collection, expected NAME=PATH");
            return Err(ExitCode::CommandLineError);
        };
        if name != DEMO_COLLECTION {
            tracing::error!(name, "no such workflow collection (dynamic module loading is out of scope)");
            return Err(ExitCode::ModuleNotFound);
        }
    }

    Ok(demo_registry())
}
