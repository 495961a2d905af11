// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! [`ResultSink`]: the one seam separating the broker-attached and
//! bus-attached worker variants. Both share the same
//! [`crate::TaskManager`]; only how a RESULT (and the initial capacity
//! announcement) leaves the process differs.

use async_trait::async_trait;
use reasonchip_wire::Packet;

/// Where a worker's RESULT packets go.
#[async_trait]
pub trait ResultSink: Send + Sync + 'static {
    /// Emit a packet (almost always a RESULT). Returns `false` if the
    /// sink could not deliver it — emission failures are logged by the
    /// caller but never treated as fatal to the task manager itself.
    async fn emit(&self, packet: Packet) -> bool;

    /// Announce declared capacity, once, before entering the
    /// multiplexing loop. The broker-attached variant sends a REGISTER
    /// packet and must return `false` on failure (fatal); the
    /// bus-attached variant has no handshake and accepts the default
    /// no-op.
    async fn register(&self, _capacity: u32) -> bool {
        true
    }
}
