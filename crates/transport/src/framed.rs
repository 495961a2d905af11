// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! Shared accept-loop plumbing for the unix-socket and TCP bindings: both
//! split a stream into owned read/write halves, then run the length-prefixed
//! frame codec over the halves. This module holds the part that's identical
//! either way.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use reasonchip_wire::Packet;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::TransportError;
use crate::server::{ConnectionId, ServerEvent};

struct ConnectionHandle {
    outbox: mpsc::UnboundedSender<Packet>,
    reader_task: JoinHandle<()>,
}

/// Table of live connections shared between a server's accept loop and
/// its `send`/`close` methods.
#[derive(Clone, Default)]
pub(crate) struct ConnectionTable(Arc<Mutex<HashMap<ConnectionId, ConnectionHandle>>>);

impl ConnectionTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register one accepted connection: spawns a writer task draining
    /// `outbox` and a reader task forwarding inbound packets to `events`,
    /// in that order so a packet can never overtake its own `Connected`
    /// event.
    pub(crate) async fn register<R, W>(&self, reader: R, writer: W, events: mpsc::Sender<ServerEvent>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let id = ConnectionId::new();
        let (outbox, mut inbox) = mpsc::unbounded_channel::<Packet>();

        tokio::spawn(async move {
            let mut writer = writer;
            while let Some(packet) = inbox.recv().await {
                if reasonchip_wire::send_packet(&mut writer, &packet).await.is_err() {
                    break;
                }
            }
        });

        let _ = events.send(ServerEvent::Connected(id)).await;

        let table = self.clone();
        let read_events = events.clone();
        let reader_task = tokio::spawn(async move {
            let mut reader = reader;
            loop {
                match reasonchip_wire::recv_packet(&mut reader).await {
                    Ok(packet) => {
                        if read_events.send(ServerEvent::Packet(id, packet)).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            table.0.lock().remove(&id);
            let _ = read_events.send(ServerEvent::Disconnected(id)).await;
            debug!(%id, "connection closed");
        });

        self.0.lock().insert(id, ConnectionHandle { outbox, reader_task });
    }

    pub(crate) fn send(&self, id: ConnectionId, packet: Packet) -> Result<(), TransportError> {
        let table = self.0.lock();
        let handle = table.get(&id).ok_or(TransportError::Closed)?;
        handle.outbox.send(packet).map_err(|_| TransportError::Closed)
    }

    pub(crate) fn close(&self, id: ConnectionId) -> Result<(), TransportError> {
        if let Some(handle) = self.0.lock().remove(&id) {
            handle.reader_task.abort();
        }
        Ok(())
    }

    pub(crate) fn close_all(&self) {
        for (_, handle) in self.0.lock().drain() {
            handle.reader_task.abort();
        }
    }
}
