// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! Engine errors. `WorkflowNotFound` and
//! `WorkflowStepMalformed` are the two that cross the wire as
//! `RESULT(rc=EXCEPTION)`; `RestartEngine`/`TerminateEngine` are
//! control-flow, modeled as [`crate::StepOutcome`] rather than errors,
//! so they never appear here.

/// An error raised while resolving or executing a workflow step.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The resolved fully-qualified name has no entry in the workflow
    /// registry, or a relative name's dot count exceeded the current
    /// call stack's depth.
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    /// The registered target is not invocable with the engine-context
    /// signature. The explicit registry in this workspace
    /// only ever holds well-typed entries, so registration itself can't
    /// produce this — it is reserved for a future dynamically-loaded
    /// registry backend and kept for wire/API parity with the
    /// distilled spec's error taxonomy.
    #[error("workflow step malformed: {0}")]
    WorkflowStepMalformed(String),
}
