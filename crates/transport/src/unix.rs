// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! Unix-domain-socket binding: the length-prefixed frame codec run directly
//! over `UnixStream`, split owned-half style.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reasonchip_wire::Packet;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

use crate::client::ClientTransport;
use crate::error::TransportError;
use crate::framed::ConnectionTable;
use crate::server::{ConnectionId, ServerEvent, ServerTransport};

/// A single unix-socket connection, client side.
pub struct UnixClientTransport {
    reader: tokio::net::unix::OwnedReadHalf,
    writer: tokio::net::unix::OwnedWriteHalf,
}

impl UnixClientTransport {
    pub async fn connect(path: &Path) -> Result<Self, TransportError> {
        let stream = UnixStream::connect(path).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self { reader, writer })
    }
}

#[async_trait]
impl ClientTransport for UnixClientTransport {
    async fn send(&mut self, packet: Packet) -> Result<(), TransportError> {
        reasonchip_wire::send_packet(&mut self.writer, &packet).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Packet, TransportError> {
        Ok(reasonchip_wire::recv_packet(&mut self.reader).await?)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        use tokio::io::AsyncWriteExt;
        self.writer.shutdown().await.ok();
        Ok(())
    }
}

/// A unix-socket listener accepting many worker or client connections.
pub struct UnixServerTransport {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    connections: ConnectionTable,
    accept_task: Option<tokio::task::JoinHandle<()>>,
}

impl UnixServerTransport {
    /// Bind the listening socket, removing a stale socket file left by a
    /// previous (crashed) process.
    pub fn bind(socket_path: impl Into<PathBuf>) -> Result<Self, TransportError> {
        let socket_path = socket_path.into();
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(&socket_path)?;
        Ok(Self { socket_path, listener: Some(listener), connections: ConnectionTable::new(), accept_task: None })
    }
}

#[async_trait]
impl ServerTransport for UnixServerTransport {
    async fn start(&mut self, events: mpsc::Sender<ServerEvent>) -> Result<(), TransportError> {
        let listener = self.listener.take().ok_or(TransportError::Closed)?;
        let connections = self.connections.clone();

        self.accept_task = Some(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let (reader, writer) = stream.into_split();
                        connections.register(reader, writer, events.clone()).await;
                    }
                    Err(e) => {
                        tracing::error!("unix accept error: {e}");
                        break;
                    }
                }
            }
        }));

        Ok(())
    }

    async fn send(&self, id: ConnectionId, packet: Packet) -> Result<(), TransportError> {
        self.connections.send(id, packet)
    }

    async fn close(&self, id: ConnectionId) -> Result<(), TransportError> {
        self.connections.close(id)
    }

    async fn stop(&mut self) -> Result<(), TransportError> {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
        self.connections.close_all();
        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }
}
