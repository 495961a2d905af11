// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! The sum-typed replacement for `RestartEngine`/`TerminateEngine`
//! exceptions: a workflow step's outcome is one
//! of three shapes, and [`crate::Engine::run`] is a loop over them
//! rather than a try/except ladder.

use serde_json::Value;

/// What a workflow step produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Normal completion with a result value.
    Value(Value),

    /// Restart-with-new-entry: `Engine::run` rebinds `(entry, args)` to
    /// `(name, args)` and loops, resolved relative to the call stack
    /// depth at the point of the request.
    Restart { name: String, args: Value },

    /// Terminate-with-result: propagates unchanged through every
    /// enclosing `branch` call back to `Engine::run`, which returns
    /// `result` immediately.
    Terminate(Value),
}
