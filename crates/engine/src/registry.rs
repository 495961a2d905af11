// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! The explicit workflow registry that substitutes for the out-of-scope
//! dynamic module loader: workflows are
//! registered as ordinary async functions under a fully-qualified dotted
//! name, rather than discovered by walking a package tree at runtime.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::context::EngineContext;
use crate::error::EngineError;
use crate::outcome::StepOutcome;

/// The result of running a single workflow step.
pub type WorkflowResult = Result<StepOutcome, EngineError>;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A registered workflow step: takes the engine context it was invoked
/// under plus its input variables, and returns a [`StepOutcome`].
pub type WorkflowFn =
    Arc<dyn Fn(EngineContext, Value) -> BoxFuture<'static, WorkflowResult> + Send + Sync>;

/// Maps fully-qualified workflow names to their implementations.
///
/// Cheaply [`Clone`]: internally an `Arc<RwLock<_>>`, so every
/// [`EngineContext`] branched from the same [`Engine`](crate::Engine)
/// shares one registry.
#[derive(Clone, Default)]
pub struct WorkflowRegistry {
    entries: Arc<RwLock<HashMap<String, WorkflowFn>>>,
}

impl WorkflowRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workflow under `name`, overwriting any prior entry.
    pub fn register<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(EngineContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WorkflowResult> + Send + 'static,
    {
        let wrapped: WorkflowFn = Arc::new(move |ctx, args| Box::pin(f(ctx, args)));
        self.entries.write().insert(name.into(), wrapped);
    }

    /// Look up a workflow by its fully-qualified name.
    pub fn get(&self, name: &str) -> Option<WorkflowFn> {
        self.entries.read().get(name).cloned()
    }

    /// Number of registered workflows.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
