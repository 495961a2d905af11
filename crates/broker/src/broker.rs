// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! [`Broker`]: the server-side multiplexor. Operates two server
//! transports, one for workers and one for clients. On RUN from a
//! client: pick a worker with `available() > 0`, record the routing,
//! forward the RUN. On RESULT from a worker: look up the originating
//! client connection, forward, then drop the routing entry. On worker
//! disconnect: synthesize `RESULT(rc=WORKER_WENT_AWAY)` for every
//! cookie it had in flight. On client disconnect: send CANCEL for
//! every cookie it originated. Built in the idiom of
//! [`reasonchip_taskmanager::TaskManager`] and
//! [`reasonchip_client::Multiplexor`]: one `tokio::select!` driver loop
//! over two event channels and a `CancellationToken`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use reasonchip_transport::{ConnectionId, ServerEvent, ServerTransport};
use reasonchip_wire::{Packet, PacketType, ResultCode};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::BrokerError;
use crate::state::State;

/// The broker process: a worker-facing [`ServerTransport`] and a
/// client-facing one, routed through the tables in [`State`].
pub struct Broker {
    state: Mutex<State>,
    worker_transport: tokio::sync::Mutex<Box<dyn ServerTransport>>,
    client_transport: tokio::sync::Mutex<Box<dyn ServerTransport>>,
    shutdown: CancellationToken,
    started: AtomicBool,
}

impl Broker {
    /// Wrap a worker-facing and a client-facing transport. Call
    /// [`Self::start`] to begin accepting connections on both.
    pub fn new(worker_transport: Box<dyn ServerTransport>, client_transport: Box<dyn ServerTransport>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::default()),
            worker_transport: tokio::sync::Mutex::new(worker_transport),
            client_transport: tokio::sync::Mutex::new(client_transport),
            shutdown: CancellationToken::new(),
            started: AtomicBool::new(false),
        })
    }

    /// How many workers are currently registered.
    pub fn worker_count(&self) -> usize {
        self.state.lock().workers.len()
    }

    /// Start both transports and the routing loop. Calling this more
    /// than once is an error.
    pub async fn start(self: &Arc<Self>) -> Result<(), BrokerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(BrokerError::AlreadyStarted);
        }

        let (worker_tx, worker_rx) = mpsc::channel(256);
        let (client_tx, client_rx) = mpsc::channel(256);

        self.worker_transport.lock().await.start(worker_tx).await?;
        self.client_transport.lock().await.start(client_tx).await?;

        let this = Arc::clone(self);
        tokio::spawn(this.run_loop(worker_rx, client_rx));

        Ok(())
    }

    /// Request shutdown of both transports.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let _ = self.worker_transport.lock().await.stop().await;
        let _ = self.client_transport.lock().await.stop().await;
    }

    async fn run_loop(
        self: Arc<Self>,
        mut worker_rx: mpsc::Receiver<ServerEvent>,
        mut client_rx: mpsc::Receiver<ServerEvent>,
    ) {
        tracing::debug!("entering broker routing loop");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                event = worker_rx.recv() => {
                    match event {
                        Some(event) => self.handle_worker_event(event).await,
                        None => break,
                    }
                }

                event = client_rx.recv() => {
                    match event {
                        Some(event) => self.handle_client_event(event).await,
                        None => break,
                    }
                }
            }
        }

        tracing::debug!("exiting broker routing loop");
    }

    async fn handle_worker_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::Connected(id) => {
                tracing::debug!(%id, "worker connected, awaiting REGISTER");
            }

            ServerEvent::Packet(id, packet) => self.handle_worker_packet(id, packet).await,

            ServerEvent::Disconnected(id) => {
                let orphaned = self.state.lock().remove_worker(id);
                if !orphaned.is_empty() {
                    tracing::warn!(%id, orphaned = orphaned.len(), "worker went away with tasks in flight");
                }
                for (cookie, origin) in orphaned {
                    let result = Packet::result_terminal(cookie, ResultCode::WorkerWentAway, None);
                    if self.client_transport.lock().await.send(origin, result).await.is_err() {
                        tracing::warn!(%origin, %cookie, "client already gone, WORKER_WENT_AWAY undeliverable");
                    }
                }
            }
        }
    }

    async fn handle_worker_packet(&self, id: ConnectionId, packet: Packet) {
        match packet.packet_type {
            PacketType::Register => {
                if !packet.is_well_formed() {
                    tracing::error!(%id, "malformed REGISTER from worker, ignoring");
                    return;
                }
                let capacity = packet.capacity.unwrap_or(0);
                self.state.lock().register_worker(id, capacity);
                tracing::info!(%id, capacity, "worker registered");
            }

            PacketType::Result => {
                let Some(cookie) = packet.cookie else {
                    tracing::error!(%id, "missing cookie on RESULT from worker");
                    return;
                };

                let origin = self.state.lock().resolve(cookie, id);
                match origin {
                    Some(client_id) => {
                        if self.client_transport.lock().await.send(client_id, packet).await.is_err() {
                            tracing::warn!(%client_id, %cookie, "client went away before RESULT could be delivered");
                        }
                    }
                    None => {
                        tracing::warn!(%cookie, "RESULT for a cookie with no known origin, dropping");
                    }
                }
            }

            other => {
                tracing::warn!(%id, ?other, "unexpected packet type from worker, dropping");
            }
        }
    }

    async fn handle_client_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::Connected(id) => {
                tracing::debug!(%id, "client connected");
            }

            ServerEvent::Packet(id, packet) => self.handle_client_packet(id, packet).await,

            ServerEvent::Disconnected(id) => {
                let outstanding = self.state.lock().remove_client(id);
                for (cookie, worker) in outstanding {
                    tracing::debug!(%id, %cookie, %worker, "client went away, cancelling its in-flight cookie");
                    if self.worker_transport.lock().await.send(worker, Packet::cancel(cookie)).await.is_err() {
                        tracing::warn!(%worker, %cookie, "worker already gone, cancel undeliverable");
                    }
                }
            }
        }
    }

    async fn handle_client_packet(&self, id: ConnectionId, packet: Packet) {
        match packet.packet_type {
            PacketType::Run => {
                if !packet.is_well_formed() {
                    tracing::error!(%id, "malformed RUN from client, ignoring");
                    return;
                }
                let Some(cookie) = packet.cookie else {
                    tracing::error!(%id, "missing cookie on well-formed RUN");
                    return;
                };

                let already_known = self.state.lock().cookie_origin.contains_key(&cookie);
                if already_known {
                    self.reply(id, Packet::result_terminal(cookie, ResultCode::CookieCollision, None)).await;
                    return;
                }

                let worker = self.state.lock().pick_worker();
                match worker {
                    Some(worker_id) => {
                        self.state.lock().admit(cookie, id, worker_id);
                        if self.worker_transport.lock().await.send(worker_id, packet).await.is_err() {
                            tracing::warn!(%worker_id, %cookie, "worker went away immediately after admission");
                        }
                    }
                    None => {
                        self.reply(id, Packet::result_terminal(cookie, ResultCode::NoCapacity, None)).await;
                    }
                }
            }

            PacketType::Cancel => {
                let Some(cookie) = packet.cookie else {
                    tracing::error!(%id, "missing cookie on CANCEL from client");
                    return;
                };

                let worker = self.state.lock().cookie_worker.get(&cookie).copied();
                match worker {
                    Some(worker_id) => {
                        if self.worker_transport.lock().await.send(worker_id, packet).await.is_err() {
                            tracing::warn!(%worker_id, %cookie, "worker already gone, cancel undeliverable");
                        }
                    }
                    None => {
                        tracing::warn!(%cookie, "CANCEL for an unknown cookie, dropping");
                    }
                }
            }

            other => {
                tracing::warn!(%id, ?other, "unexpected packet type from client, dropping");
            }
        }
    }

    async fn reply(&self, client: ConnectionId, packet: Packet) {
        if self.client_transport.lock().await.send(client, packet).await.is_err() {
            tracing::warn!(%client, "client went away before admission reply could be delivered");
        }
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
