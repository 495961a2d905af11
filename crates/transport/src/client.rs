// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! The client-side transport contract every binding (unix/tcp/gRPC/HTTP)
//! implements symmetrically.

use async_trait::async_trait;
use reasonchip_wire::Packet;

use crate::error::TransportError;

/// One logical, ordered connection to a remote peer (broker or worker).
///
/// Implementations do not retry or reconnect on their own; a dropped
/// connection surfaces as `Err(TransportError::Closed)` from `recv` and
/// the caller (Multiplexor / TaskManager) decides what to do next.
#[async_trait]
pub trait ClientTransport: Send + Sync {
    /// Send one packet. Packets on a single connection are delivered in
    /// the order they were sent.
    async fn send(&mut self, packet: Packet) -> Result<(), TransportError>;

    /// Receive the next packet, or `Err(TransportError::Closed)` once the
    /// peer has gone away.
    async fn recv(&mut self) -> Result<Packet, TransportError>;

    /// Close the connection. Idempotent.
    async fn close(&mut self) -> Result<(), TransportError>;
}
