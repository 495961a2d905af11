// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

/// Errors raised by [`crate::Broker::start`].
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// `start()` was called on an already-started broker.
    #[error("broker is already started")]
    AlreadyStarted,

    /// One of the two server-transports failed to begin listening.
    #[error("transport failed to start: {0}")]
    TransportStart(#[from] reasonchip_transport::TransportError),
}
