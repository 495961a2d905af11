// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! Workspace-level scenario tests, grouped by area under
//! `tests/specs/<area>/<scenario>.rs`.

#[path = "prelude.rs"]
mod prelude;

#[path = "specs/cli/help.rs"]
mod cli_help;
#[path = "specs/cli/run.rs"]
mod cli_run;
#[path = "specs/cli/dispatch.rs"]
mod cli_dispatch;

#[path = "specs/engine/restart_and_terminate.rs"]
mod engine_restart_and_terminate;
#[path = "specs/engine/relative_resolution.rs"]
mod engine_relative_resolution;

#[path = "specs/broker/routing.rs"]
mod broker_routing;
