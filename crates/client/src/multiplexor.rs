// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! [`Multiplexor`]: fans many logical [`crate::Client`]s through one
//! [`ClientTransport`], demultiplexing replies by cookie. The two-map
//! structure (`connections`, `cookies`) is kept under a single
//! `parking_lot::Mutex` since every critical section here is a short,
//! synchronous map mutation, never held across an await point.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use reasonchip_core::Cookie;
use reasonchip_transport::ClientTransport;
use reasonchip_wire::{Packet, PacketType, ResultCode};
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

use crate::connection::{Client, ConnectionId};
use crate::error::ClientError;

struct ConnectionEntry {
    cookies: HashSet<Cookie>,
    inbox: mpsc::UnboundedSender<Packet>,
}

#[derive(Default)]
struct State {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    cookies: HashMap<Cookie, ConnectionId>,
}

/// Carries many logical [`Client`]s over one transport.
pub struct Multiplexor {
    state: Mutex<State>,
    outbound: mpsc::UnboundedSender<Packet>,
    dead: AtomicBool,
    dead_notify: Notify,
    driver: tokio::sync::Mutex<Option<(mpsc::UnboundedReceiver<Packet>, Box<dyn ClientTransport>)>>,
    started: AtomicBool,
    shutdown: CancellationToken,
}

impl Multiplexor {
    /// Wrap `transport`. Call [`Self::start`] to begin pumping events.
    pub fn new(transport: Box<dyn ClientTransport>) -> Arc<Self> {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            state: Mutex::new(State::default()),
            outbound,
            dead: AtomicBool::new(false),
            dead_notify: Notify::new(),
            driver: tokio::sync::Mutex::new(Some((outbound_rx, transport))),
            started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        })
    }

    /// Start the driver task. Calling this more than once is an error.
    pub async fn start(self: &Arc<Self>) -> Result<(), ClientError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ClientError::AlreadyStarted);
        }

        let (outbound_rx, transport) = self
            .driver
            .lock()
            .await
            .take()
            .ok_or(ClientError::AlreadyStarted)?;

        let this = Arc::clone(self);
        tokio::spawn(this.run_loop(transport, outbound_rx));
        Ok(())
    }

    /// Register a new logical connection and return a [`Client`] scope
    /// for it. The returned `Client` releases its registration on drop.
    pub fn register(self: &Arc<Self>) -> Client {
        let id = ConnectionId::new();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        self.state.lock().connections.insert(id, ConnectionEntry { cookies: HashSet::new(), inbox: inbox_tx });
        Client::new(Arc::clone(self), id, inbox_rx)
    }

    /// Tear down a logical connection's bookkeeping. Idempotent.
    pub fn release(&self, id: ConnectionId) {
        let mut state = self.state.lock();
        if let Some(entry) = state.connections.remove(&id) {
            for cookie in entry.cookies {
                state.cookies.remove(&cookie);
            }
        }
    }

    /// Send `packet` on behalf of logical connection `id`. The packet
    /// must carry a cookie; a fresh cookie is
    /// recorded against `id` so the eventual reply is routed back here.
    pub async fn send(&self, id: ConnectionId, packet: Packet) -> Result<(), ClientError> {
        if self.is_dead() {
            return Err(ClientError::Dead);
        }

        let cookie = packet.cookie.ok_or(ClientError::MissingCookie)?;

        {
            let mut state = self.state.lock();
            if !state.connections.contains_key(&id) {
                return Err(ClientError::UnknownConnection);
            }
            state.cookies.entry(cookie).or_insert(id);
            if let Some(entry) = state.connections.get_mut(&id) {
                entry.cookies.insert(cookie);
            }
        }

        self.outbound.send(packet).map_err(|_| ClientError::Dead)
    }

    /// Snapshot a logical connection's bookkeeping, or `None` if it is not (or no longer)
    /// registered.
    pub fn connection_info(&self, id: ConnectionId) -> Option<crate::connection::ConnectionInfo> {
        let state = self.state.lock();
        state.connections.get(&id).map(|entry| crate::connection::ConnectionInfo {
            connection_id: id,
            cookies: entry.cookies.iter().copied().collect(),
        })
    }

    /// Whether the death process has already run.
    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }

    /// Wait for the death process to run (transport closed or `stop`
    /// called). Returns immediately if it already has.
    pub async fn wait_dead(&self) {
        if self.is_dead() {
            return;
        }
        self.dead_notify.notified().await;
    }

    /// Request shutdown and wait for the driver to finish and the death
    /// process to run. Idempotent.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        self.wait_dead().await;
    }

    async fn run_loop(self: Arc<Self>, mut transport: Box<dyn ClientTransport>, mut outbound_rx: mpsc::UnboundedReceiver<Packet>) {
        tracing::debug!("entering client multiplexor driver loop");

        loop {
            tokio::select! {
                biased;

                maybe_out = outbound_rx.recv() => {
                    match maybe_out {
                        Some(packet) => {
                            if transport.send(packet).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }

                incoming = transport.recv() => {
                    match incoming {
                        Ok(packet) => self.incoming(packet),
                        Err(_) => break,
                    }
                }

                _ = self.shutdown.cancelled() => {
                    break;
                }
            }
        }

        let _ = transport.close().await;
        self.death_process();

        tracing::debug!("exiting client multiplexor driver loop");
    }

    fn incoming(&self, packet: Packet) {
        let Some(cookie) = packet.cookie else {
            tracing::warn!("dropping inbound packet with no cookie");
            return;
        };

        let mut state = self.state.lock();
        let Some(&id) = state.cookies.get(&cookie) else {
            tracing::warn!(%cookie, "dropping packet for an unknown cookie (routing)");
            return;
        };

        let terminal = packet.packet_type == PacketType::Result;

        if let Some(entry) = state.connections.get(&id) {
            let _ = entry.inbox.send(packet);
        }

        if terminal {
            state.cookies.remove(&cookie);
            if let Some(entry) = state.connections.get_mut(&id) {
                entry.cookies.remove(&cookie);
            }
        }
    }

    /// Synthesize a terminal RESULT(rc=BROKER_WENT_AWAY) for every
    /// outstanding cookie on every connection, then clear all mappings.
    /// Guarantees every waiter observes exactly one terminal
    /// RESULT, and no further packets are delivered after.
    fn death_process(&self) {
        let mut state = self.state.lock();

        for (_, entry) in state.connections.iter() {
            for cookie in entry.cookies.iter() {
                let packet = Packet::result_terminal(
                    *cookie,
                    ResultCode::BrokerWentAway,
                    Some("connection to broker lost".to_string()),
                );
                let _ = entry.inbox.send(packet);
            }
        }

        state.connections.clear();
        state.cookies.clear();

        drop(state);

        self.dead.store(true, Ordering::SeqCst);
        self.dead_notify.notify_waiters();
    }
}

#[cfg(test)]
#[path = "multiplexor_tests.rs"]
mod tests;
