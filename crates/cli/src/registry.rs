// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! The built-in `demo` workflow collection. Dynamic loading of workflow modules from disk is
//! explicitly out of scope; the only collection this binary knows how to
//! populate is the literal name `demo`, used by the scenario tests and
//! by anyone kicking the tires with `reasonchip run demo.hello`. A
//! `--collection <name>=<path>` naming anything else is a configuration
//! error, not an attempt to load
//! `<path>`.

use serde_json::{json, Value};

use reasonchip_engine::{StepOutcome, WorkflowRegistry};

/// The name `--collection` must spell to get anything registered.
pub const DEMO_COLLECTION: &str = "demo";

/// Build a registry over the `demo` collection's workflows:
///
/// - `demo.hello` returns `{"message": "hello, <name>"}`, reading `name`
///   from its argument object (defaulting to `"world"`) — the happy-path
///   happy-path scenario.
/// - `demo.chain` calls `demo.hello` via a relative `.hello` branch and
///   returns its value unchanged, exercising relative name resolution
///   through relative resolution.
/// - `demo.restart` requests a restart into `demo.hello`.
/// - `demo.fail` returns an `Err`, exercising the exception/RESULT path.
pub fn demo_registry() -> WorkflowRegistry {
    let registry = WorkflowRegistry::new();

    registry.register("demo.hello", |_ctx, args| async move {
        let name = args.get("name").and_then(Value::as_str).unwrap_or("world");
        Ok(StepOutcome::Value(json!({ "message": format!("hello, {name}") })))
    });

    registry.register("demo.chain", |ctx, args| async move { ctx.branch(".hello", args).await });

    registry.register("demo.restart", |_ctx, args| async move {
        Ok(StepOutcome::Restart { name: "demo.hello".to_string(), args })
    });

    registry.register("demo.fail", |_ctx, _args| async move {
        Err(reasonchip_engine::EngineError::WorkflowStepMalformed(
            "demo.fail always fails".to_string(),
        ))
    });

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use reasonchip_engine::Engine;

    #[tokio::test]
    async fn hello_greets_the_given_name() {
        let engine = Engine::new(demo_registry());
        let result = engine.run("demo.hello", json!({ "name": "ada" })).await.unwrap();
        assert_eq!(result, json!({ "message": "hello, ada" }));
    }

    #[tokio::test]
    async fn hello_defaults_to_world() {
        let engine = Engine::new(demo_registry());
        let result = engine.run("demo.hello", json!({})).await.unwrap();
        assert_eq!(result, json!({ "message": "hello, world" }));
    }

    #[tokio::test]
    async fn chain_resolves_its_sibling_relatively() {
        let engine = Engine::new(demo_registry());
        let result = engine.run("demo.chain", json!({ "name": "rin" })).await.unwrap();
        assert_eq!(result, json!({ "message": "hello, rin" }));
    }

    #[tokio::test]
    async fn restart_rebinds_into_hello() {
        let engine = Engine::new(demo_registry());
        let result = engine.run("demo.restart", json!({ "name": "sam" })).await.unwrap();
        assert_eq!(result, json!({ "message": "hello, sam" }));
    }
}
