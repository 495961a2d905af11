// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! The server-side transport contract: symmetric to [`crate::client`], but
//! addressed by [`ConnectionId`] since a server multiplexes many peers.

use async_trait::async_trait;
use reasonchip_wire::Packet;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::TransportError;

/// Identifies one accepted connection for the lifetime of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An event pushed from a server's accept loop to its owner (broker or bus
/// adapter). Connection lifecycle and inbound packets share one channel so
/// ordering between "connected" / "packet" / "disconnected" is preserved
/// per connection.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    Connected(ConnectionId),
    Packet(ConnectionId, Packet),
    Disconnected(ConnectionId),
}

/// A listening endpoint accepting connections from many peers.
///
/// `start` spawns the accept loop and returns once it is listening;
/// accepted connections are reported as [`ServerEvent`]s on the supplied
/// channel, with one task per connection rather than blocking the caller.
#[async_trait]
pub trait ServerTransport: Send {
    async fn start(&mut self, events: mpsc::Sender<ServerEvent>) -> Result<(), TransportError>;

    /// Send a packet to one connection. A connection that has already
    /// gone away yields `Err(TransportError::Closed)`.
    async fn send(&self, id: ConnectionId, packet: Packet) -> Result<(), TransportError>;

    /// Forcibly close one connection.
    async fn close(&self, id: ConnectionId) -> Result<(), TransportError>;

    /// Stop accepting new connections and tear down the listener.
    async fn stop(&mut self) -> Result<(), TransportError>;
}
