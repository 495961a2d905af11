// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

/// Errors raised by [`crate::TaskManager::start`].
#[derive(Debug, thiserror::Error)]
pub enum TaskManagerError {
    /// `capacity` must be at least one.
    #[error("task manager capacity must be at least 1")]
    ZeroCapacity,

    /// `start()` was called on an already-started task manager.
    #[error("task manager is already started")]
    AlreadyStarted,

    /// The REGISTER handshake (or equivalent) failed.
    #[error("registration failed")]
    RegistrationFailed,
}
