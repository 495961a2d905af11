// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! Process exit codes for the `reasonchip` CLI.

/// The exit code a subcommand hands back to `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Ok = 0,
    CommandLineError = 1,
    ConfigurationProblem = 2,
    UnknownCommand = 3,
    ModuleNotFound = 4,
    Error = 5,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}
