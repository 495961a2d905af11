// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

/// Errors raised by [`crate::BusProducer`] and [`crate::BusConsumer`].
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Connecting to the AMQP broker, opening a channel, or declaring the
    /// exchange/queue failed.
    #[error("failed to connect to AMQP broker: {0}")]
    Connect(#[source] lapin::Error),

    /// Publishing or consuming a message failed once connected.
    #[error("AMQP operation failed: {0}")]
    Amqp(#[source] lapin::Error),

    /// A message body was not valid UTF-8/JSON for a `Packet`.
    #[error("malformed packet on the bus: {0}")]
    MalformedPacket(#[source] serde_json::Error),

    /// `start()` was called on an already-started consumer.
    #[error("bus consumer is already started")]
    AlreadyStarted,
}
