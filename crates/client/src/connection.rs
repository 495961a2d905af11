// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! [`ConnectionId`], [`ConnectionInfo`],
//! and the [`Client`] scope built on top of a [`crate::Multiplexor`]
//! registration.

use std::sync::Arc;
use std::time::Duration;

use reasonchip_core::Cookie;
use reasonchip_wire::Packet;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::ClientError;
use crate::multiplexor::Multiplexor;

/// Identifies one logical connection registered against a
/// [`Multiplexor`] for the lifetime of one [`Client`] scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A snapshot of one logical connection's bookkeeping: which cookies it currently has outstanding.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub connection_id: ConnectionId,
    pub cookies: Vec<Cookie>,
}

/// A short-lived scope around one logical connection to a broker.
/// `Client::new`/[`Multiplexor::register`] registers it;
/// dropping the `Client` releases it.
pub struct Client {
    multiplexor: Arc<Multiplexor>,
    id: ConnectionId,
    inbox: mpsc::UnboundedReceiver<Packet>,
}

impl Client {
    pub(crate) fn new(multiplexor: Arc<Multiplexor>, id: ConnectionId, inbox: mpsc::UnboundedReceiver<Packet>) -> Self {
        Self { multiplexor, id, inbox }
    }

    /// This connection's id.
    pub fn connection_id(&self) -> ConnectionId {
        self.id
    }

    /// Stamp `packet` with a cookie if it has none, record it against
    /// this connection, and send it.
    pub async fn send(&self, mut packet: Packet) -> Result<Cookie, ClientError> {
        let cookie = packet.cookie.unwrap_or_else(Cookie::new);
        packet.cookie = Some(cookie);
        self.multiplexor.send(self.id, packet).await?;
        Ok(cookie)
    }

    /// Send a packet that already carries an explicit cookie (e.g. a
    /// CANCEL for a RUN this client previously issued).
    pub async fn send_with_cookie(&self, packet: Packet) -> Result<(), ClientError> {
        if packet.cookie.is_none() {
            return Err(ClientError::MissingCookie);
        }
        self.multiplexor.send(self.id, packet).await
    }

    /// Await the next packet routed to this connection, or `None` if
    /// `timeout` elapses first. Timing out does not cancel any
    /// in-flight engine work.
    pub async fn receive(&mut self, timeout: Option<Duration>) -> Option<Packet> {
        match timeout {
            Some(duration) => tokio::time::timeout(duration, self.inbox.recv()).await.ok().flatten(),
            None => self.inbox.recv().await,
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.multiplexor.release(self.id);
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
