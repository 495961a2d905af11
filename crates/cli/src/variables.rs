// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! Variable assembly shared by `run` and `dispatch`: successive `--vars`
//! files are deep-merged right-biased, then `--set key=value` overrides
//! are layered on top.

use std::path::Path;

use anyhow::{Context, Result};
use reasonchip_core::{deep_merge, parse_set_token, set_path};
use serde_json::Value;

/// Load and merge `--vars`/`--variables` files, then layer `--set`
/// overrides on top, in command-line order.
pub fn assemble(var_files: &[String], set_tokens: &[String]) -> Result<Value> {
    let mut vars = Value::Object(serde_json::Map::new());

    for path in var_files {
        let raw = std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("reading variable file {path}"))?;
        let parsed: Value =
            serde_json::from_str(&raw).with_context(|| format!("parsing variable file {path} as JSON"))?;
        deep_merge(&mut vars, &parsed);
    }

    for token in set_tokens {
        let (key, value) =
            parse_set_token(token).with_context(|| format!("invalid key=value pair: {token}"))?;
        set_path(&mut vars, &key, value);
    }

    Ok(vars)
}
