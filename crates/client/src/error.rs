// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

/// Errors raised by [`crate::Multiplexor`] and [`crate::Client`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The multiplexor's transport has already gone away (the death
    /// process has run).
    #[error("multiplexor transport is dead")]
    Dead,

    /// `send` was called with a packet that carries no cookie; every
    /// packet routed through a logical connection must carry one.
    #[error("packet carries no cookie")]
    MissingCookie,

    /// The referenced logical connection is not (or no longer)
    /// registered.
    #[error("unknown connection")]
    UnknownConnection,

    /// `start` was called on an already-started multiplexor.
    #[error("multiplexor is already started")]
    AlreadyStarted,
}
