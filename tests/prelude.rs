// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! Shared helpers for the workspace-level scenario tests under
//! `tests/specs/`.

#![allow(dead_code)]

use assert_cmd::assert::Assert;
use assert_cmd::Command;

/// A handle on the built `reasonchip` binary.
pub fn cli() -> Command {
    Command::cargo_bin("reasonchip").expect("reasonchip binary should be built by cargo test")
}

/// Thin assertions over `assert_cmd::Assert`'s own `Output`, kept free
/// of the `predicates` crate so every spec reads as plain English.
pub trait AssertExt {
    fn passes(self) -> Self;
    fn fails_with(self, code: i32) -> Self;
    fn stdout_has(self, needle: &str) -> Self;
    fn stderr_has(self, needle: &str) -> Self;
}

impl AssertExt for Assert {
    fn passes(self) -> Self {
        self.success()
    }

    fn fails_with(self, code: i32) -> Self {
        self.code(code)
    }

    fn stdout_has(self, needle: &str) -> Self {
        let stdout = String::from_utf8_lossy(&self.get_output().stdout).into_owned();
        assert!(stdout.contains(needle), "stdout did not contain {needle:?}:\n{stdout}");
        self
    }

    fn stderr_has(self, needle: &str) -> Self {
        let stderr = String::from_utf8_lossy(&self.get_output().stderr).into_owned();
        assert!(stderr.contains(needle), "stderr did not contain {needle:?}:\n{stderr}");
        self
    }
}
