// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! A small dotted-key-path configuration tree over a JSON value, the
//! vehicle for the CLI's `--set key=value`/`--vars <file>` overrides and
//! the embedded runner's variable merge.
//!
//! No typed getters (`getBool`/`getFloat`/...) — this workspace keeps
//! everything as `serde_json::Value` end to end and leaves typed access
//! to callers.

use serde_json::Value;

use crate::vars::{deep_merge, set_path};

/// A JSON object addressed by dotted key paths (`db.host`), with
/// right-biased deep-merge semantics for combining successive sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    root: Value,
}

impl Config {
    /// An empty configuration tree.
    pub fn new() -> Self {
        Self { root: Value::Object(serde_json::Map::new()) }
    }

    /// Wrap an existing JSON value as the configuration root.
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// The configuration as a JSON value.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    /// Whether a dotted key path resolves to a present value.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Look up a dotted key path (`"db.host"`), descending through
    /// nested objects.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut cursor = &self.root;
        for segment in key.split('.') {
            cursor = cursor.as_object()?.get(segment)?;
        }
        Some(cursor)
    }

    /// Set a dotted key path, creating intermediate objects as needed.
    pub fn set(&mut self, key: &str, value: Value) {
        set_path(&mut self.root, key, value);
    }

    /// Deep-merge another configuration tree into this one, right-biased
    /// (the merged-in tree's scalars win, nested objects recurse).
    pub fn merge(&mut self, overlay: &Config) {
        deep_merge(&mut self.root, &overlay.root);
    }

    /// Deep-merge a raw JSON object into this one.
    pub fn merge_value(&mut self, overlay: &Value) {
        deep_merge(&mut self.root, overlay);
    }

    /// Extract a nested object as its own `Config`, mirroring
    /// `Config.getNamespace`.
    pub fn namespace(&self, key: &str) -> Config {
        match self.get(key) {
            Some(value) => Config::from_value(value.clone()),
            None => Config::new(),
        }
    }
}
