// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! Variable merging for the embedded runner and the `dispatch`/`run` CLI
//! commands: right-biased deep merge of JSON objects, plus dotted
//! key-path overrides (`a.b.c=value`).

use serde_json::Value;

/// Deep-merge `overlay` into `base`, right-biased: for two JSON objects the
/// keys are merged recursively; for anything else `overlay` wins outright.
///
/// This mirrors the original `_deep_merge` helper used to combine
/// successive `--vars` files before a workflow dispatch.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

/// Set a value at a dotted key path, creating intermediate objects as
/// needed. `root` must be (or become) a JSON object.
///
/// Mirrors `--set key=value` overrides applied after `--vars` files are
/// merged: `set_path(&mut vars, "db.host", json!("localhost"))`.
pub fn set_path(root: &mut Value, path: &str, value: Value) {
    if !root.is_object() {
        *root = Value::Object(serde_json::Map::new());
    }

    let mut segments = path.split('.').peekable();
    let mut cursor = root;

    while let Some(segment) = segments.next() {
        let is_last = segments.peek().is_none();

        let map = cursor
            .as_object_mut()
            .expect("cursor is always kept as an object by construction");

        if is_last {
            map.insert(segment.to_string(), value);
            return;
        }

        cursor = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));

        if !cursor.is_object() {
            *cursor = Value::Object(serde_json::Map::new());
        }
    }
}

/// Parse a `key=value` CLI token into a dotted key path and a JSON value.
///
/// The value is interpreted as JSON when possible (`true`, `42`, `"str"`,
/// `{"a":1}`) and falls back to a plain string otherwise, so `--set
/// count=3` yields a number while `--set name=bob` yields a string.
pub fn parse_set_token(token: &str) -> Option<(String, Value)> {
    let (key, raw_value) = token.split_once('=')?;
    let value = serde_json::from_str(raw_value)
        .unwrap_or_else(|_| Value::String(raw_value.to_string()));
    Some((key.to_string(), value))
}
