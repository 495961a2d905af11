// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! [`Engine`]: the top-level entry point that drives one workflow run
//! to completion by looping over [`StepOutcome`]s.

use serde_json::Value;

use crate::context::EngineContext;
use crate::error::EngineError;
use crate::outcome::StepOutcome;
use crate::registry::WorkflowRegistry;

/// Drives workflow runs against a [`WorkflowRegistry`].
#[derive(Clone)]
pub struct Engine {
    registry: WorkflowRegistry,
}

impl Engine {
    /// Create an engine over `registry`.
    pub fn new(registry: WorkflowRegistry) -> Self {
        Self { registry }
    }

    /// Run the workflow named `entry` with `args`, to completion.
    ///
    /// Creates one [`EngineContext`] for the whole run, before the
    /// loop begins, and reuses it across every `Restart` — its
    /// callable `cache` and `user_state` are per-*invocation* state
    /// (not per-step), so a workflow can stash state before requesting
    /// a restart and read it back afterward, and a restart never
    /// re-triggers loading a callable this run has already cached.
    ///
    /// Each step's outcome is one of:
    /// - `Value` — the run is done; return it.
    /// - `Terminate` — the run is done; return the terminated value
    ///   without resuming any enclosing caller (it has already
    ///   propagated past every `branch` on the way out of the stack).
    /// - `Restart` — rebind `(entry, args)` and loop, starting a fresh
    ///   top-level call with an empty call stack.
    pub async fn run(&self, entry: &str, args: Value) -> Result<Value, EngineError> {
        let mut entry = entry.to_string();
        let mut args = args;
        let ctx = EngineContext::new(self.registry.clone());

        loop {
            match ctx.branch(&entry, args).await? {
                StepOutcome::Value(value) => return Ok(value),
                StepOutcome::Terminate(value) => return Ok(value),
                StepOutcome::Restart { name, args: next } => {
                    entry = name;
                    args = next;
                }
            }
        }
    }
}
