// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! [`EngineContext`]: the per-run handle threaded through every workflow
//! step invocation. Carries the call stack that dotted-relative
//! names resolve against, a per-context callable cache keyed by resolved
//! name, and a free-form user-state map workflows may use to pass data
//! across sibling steps.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::EngineError;
use crate::outcome::StepOutcome;
use crate::registry::{WorkflowFn, WorkflowRegistry};
use crate::resolve::resolve;

struct Inner {
    registry: WorkflowRegistry,
    // Call stack access is always brief (push/pop/snapshot), never held
    // across an await point, so a plain sync mutex is the right tool.
    call_stack: SyncMutex<Vec<String>>,
    // The callable cache is populated and read from inside async
    // workflow bodies, so it needs an async-aware lock.
    cache: AsyncMutex<HashMap<String, WorkflowFn>>,
    user_state: SyncMutex<HashMap<String, Value>>,
}

/// A handle to one workflow run's shared state.
///
/// Cheaply [`Clone`]: an `Arc` around the shared state, so every nested
/// [`branch`](EngineContext::branch) call sees the same call stack,
/// cache, and user state as its caller.
#[derive(Clone)]
pub struct EngineContext {
    inner: Arc<Inner>,
}

impl EngineContext {
    /// Start a fresh context over `registry`, with an empty call stack.
    pub fn new(registry: WorkflowRegistry) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                call_stack: SyncMutex::new(Vec::new()),
                cache: AsyncMutex::new(HashMap::new()),
                user_state: SyncMutex::new(HashMap::new()),
            }),
        }
    }

    /// The call stack's current depth.
    pub fn depth(&self) -> usize {
        self.inner.call_stack.lock().len()
    }

    /// A snapshot of the call stack, most recent frame last.
    pub fn stack_snapshot(&self) -> Vec<String> {
        self.inner.call_stack.lock().clone()
    }

    /// Set a user-state value visible to every context sharing this
    /// run.
    pub fn set_state(&self, key: impl Into<String>, value: Value) {
        self.inner.user_state.lock().insert(key.into(), value);
    }

    /// Read a user-state value.
    pub fn get_state(&self, key: &str) -> Option<Value> {
        self.inner.user_state.lock().get(key).cloned()
    }

    /// Resolve, fetch, and invoke the workflow step named `name` against
    /// `args`, pushing a new call-stack frame for the duration.
    ///
    /// The pushed frame is popped unconditionally before this function
    /// returns, on every path — success, error, or a `Restart`/
    /// `Terminate` outcome — so the stack stays balanced regardless of
    /// how the callee resolved. A `Restart` outcome's `name` is
    /// rewritten to absolute form using the stack as it stood at push
    /// time (i.e. including the frame this call just popped), so it
    /// resolves identically however many times [`Engine::run`](crate::Engine::run)
    /// loops over it.
    pub async fn branch(&self, name: &str, args: Value) -> Result<StepOutcome, EngineError> {
        let snapshot_before_push = self.stack_snapshot();
        let resolved = resolve(name, &snapshot_before_push)?;

        let callable = self.fetch(&resolved).await?;

        self.inner.call_stack.lock().push(resolved.clone());
        let push_snapshot = {
            let stack = self.inner.call_stack.lock();
            stack.clone()
        };

        let outcome = callable(self.clone(), args).await;

        self.inner.call_stack.lock().pop();

        match outcome? {
            StepOutcome::Restart { name, args } => {
                let rewritten = resolve(&name, &push_snapshot)?;
                Ok(StepOutcome::Restart {
                    name: rewritten,
                    args,
                })
            }
            other => Ok(other),
        }
    }

    async fn fetch(&self, resolved: &str) -> Result<WorkflowFn, EngineError> {
        let mut cache = self.inner.cache.lock().await;
        if let Some(cached) = cache.get(resolved) {
            return Ok(cached.clone());
        }

        let callable = self
            .inner
            .registry
            .get(resolved)
            .ok_or_else(|| EngineError::WorkflowNotFound(resolved.to_string()))?;
        cache.insert(resolved.to_string(), callable.clone());
        Ok(callable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_identity(name: &str) -> WorkflowRegistry {
        let registry = WorkflowRegistry::new();
        registry.register(name.to_string(), |_ctx, args| async move {
            Ok(StepOutcome::Value(args))
        });
        registry
    }

    #[tokio::test]
    async fn branch_pushes_and_pops_the_call_stack() {
        let registry = WorkflowRegistry::new();
        registry.register("pkg.probe", |ctx: EngineContext, _args| async move {
            Ok(StepOutcome::Value(Value::from(ctx.depth())))
        });
        let ctx = EngineContext::new(registry);

        assert_eq!(ctx.depth(), 0);
        let out = ctx.branch("pkg.probe", Value::Null).await.unwrap();
        assert_eq!(out, StepOutcome::Value(Value::from(1)));
        assert_eq!(ctx.depth(), 0);
    }

    #[tokio::test]
    async fn the_stack_is_popped_even_when_the_callee_errors() {
        let registry = WorkflowRegistry::new();
        registry.register("pkg.boom", |_ctx, _args| async move {
            Err(EngineError::WorkflowStepMalformed("boom".into()))
        });
        let ctx = EngineContext::new(registry);

        assert!(ctx.branch("pkg.boom", Value::Null).await.is_err());
        assert_eq!(ctx.depth(), 0);
    }

    #[tokio::test]
    async fn an_unregistered_name_never_touches_the_stack() {
        let ctx = EngineContext::new(WorkflowRegistry::new());
        assert!(ctx.branch("pkg.missing", Value::Null).await.is_err());
        assert_eq!(ctx.depth(), 0);
    }

    #[tokio::test]
    async fn nested_branch_resolves_relative_names_against_the_inner_frame() {
        let registry = WorkflowRegistry::new();
        registry.register("pkg.sub.a", |ctx: EngineContext, args| async move {
            ctx.branch(".sibling", args).await
        });
        registry.register("pkg.sub.sibling", |_ctx, args| async move {
            Ok(StepOutcome::Value(args))
        });
        let ctx = EngineContext::new(registry);

        let out = ctx
            .branch("pkg.sub.a", Value::String("ok".into()))
            .await
            .unwrap();
        assert_eq!(out, StepOutcome::Value(Value::String("ok".into())));
    }

    #[tokio::test]
    async fn repeated_cache_hits_return_the_same_callable() {
        let registry = registry_with_identity("pkg.hello");
        let ctx = EngineContext::new(registry);

        ctx.branch("pkg.hello", Value::Null).await.unwrap();
        ctx.branch("pkg.hello", Value::Null).await.unwrap();
    }

    #[tokio::test]
    async fn a_restart_name_is_rewritten_to_absolute_form_before_returning() {
        let registry = WorkflowRegistry::new();
        registry.register("pkg.sub.a", |_ctx, args| async move {
            Ok(StepOutcome::Restart {
                name: "..other".to_string(),
                args,
            })
        });
        let ctx = EngineContext::new(registry);

        let out = ctx.branch("pkg.sub.a", Value::Null).await.unwrap();
        match out {
            StepOutcome::Restart { name, .. } => assert_eq!(name, "pkg.other"),
            _ => panic!("expected Restart"),
        }
    }
}
