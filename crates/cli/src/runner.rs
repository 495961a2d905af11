// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! [`LocalRunner`]: the in-process embedded variant — no broker,
//! no worker, no wire protocol. `reasonchip run` assembles variables and
//! calls straight into [`reasonchip_engine::Engine::run`] in the same
//! process, the way an embedding binary that links this crate as a
//! library would.

use anyhow::Result;
use serde_json::Value;

use reasonchip_engine::{Engine, WorkflowRegistry};

/// Runs a workflow to completion against an in-process registry.
pub struct LocalRunner {
    engine: Engine,
}

impl LocalRunner {
    pub fn new(registry: WorkflowRegistry) -> Self {
        Self { engine: Engine::new(registry) }
    }

    /// Run `entry` with `variables`, returning the workflow's terminal
    /// value.
    pub async fn run(&self, entry: &str, variables: Value) -> Result<Value> {
        Ok(self.engine.run(entry, variables).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::demo_registry;
    use serde_json::json;

    #[tokio::test]
    async fn runs_a_demo_workflow_to_completion() {
        let runner = LocalRunner::new(demo_registry());
        let result = runner.run("demo.hello", json!({ "name": "embedded" })).await.unwrap();
        assert_eq!(result, json!({ "message": "hello, embedded" }));
    }

    #[tokio::test]
    async fn propagates_an_unresolvable_entry_as_an_error() {
        let runner = LocalRunner::new(demo_registry());
        assert!(runner.run("demo.nowhere", Value::Null).await.is_err());
    }
}
