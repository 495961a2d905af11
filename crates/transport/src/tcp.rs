// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! TCP binding: the length-prefixed frame codec run over `TcpStream`,
//! optionally behind `rustls`.

use async_trait::async_trait;
use reasonchip_wire::Packet;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_rustls::{TlsAcceptor, TlsConnector};

use crate::client::ClientTransport;
use crate::error::TransportError;
use crate::framed::ConnectionTable;
use crate::server::{ConnectionId, ServerEvent, ServerTransport};
use crate::tls::TlsConfig;

/// A single TCP connection, client side, plain or TLS.
pub enum TcpClientTransport {
    Plain { reader: tokio::net::tcp::OwnedReadHalf, writer: tokio::net::tcp::OwnedWriteHalf },
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl TcpClientTransport {
    pub async fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        let stream = TcpStream::connect((host, port)).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self::Plain { reader, writer })
    }

    pub async fn connect_tls(host: &str, port: u16, tls: &TlsConfig) -> Result<Self, TransportError> {
        let stream = TcpStream::connect((host, port)).await?;
        let config = tls.client_config()?;
        let connector = TlsConnector::from(config);
        let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        let stream = connector.connect(server_name, stream).await?;
        Ok(Self::Tls(Box::new(stream)))
    }
}

#[async_trait]
impl ClientTransport for TcpClientTransport {
    async fn send(&mut self, packet: Packet) -> Result<(), TransportError> {
        match self {
            Self::Plain { writer, .. } => reasonchip_wire::send_packet(writer, &packet).await?,
            Self::Tls(stream) => reasonchip_wire::send_packet(stream, &packet).await?,
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Packet, TransportError> {
        let packet = match self {
            Self::Plain { reader, .. } => reasonchip_wire::recv_packet(reader).await?,
            Self::Tls(stream) => reasonchip_wire::recv_packet(stream).await?,
        };
        Ok(packet)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        use tokio::io::AsyncWriteExt;
        match self {
            Self::Plain { writer, .. } => writer.shutdown().await.ok(),
            Self::Tls(stream) => stream.shutdown().await.ok(),
        };
        Ok(())
    }
}

/// A TCP listener accepting many connections, optionally TLS-wrapped.
pub struct TcpServerTransport {
    listener: Option<TcpListener>,
    tls_acceptor: Option<TlsAcceptor>,
    connections: ConnectionTable,
    accept_task: Option<tokio::task::JoinHandle<()>>,
}

impl TcpServerTransport {
    pub async fn bind(addr: (&str, u16)) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener: Some(listener), tls_acceptor: None, connections: ConnectionTable::new(), accept_task: None })
    }

    pub async fn bind_tls(addr: (&str, u16), tls: &TlsConfig) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        let config = tls.server_config()?;
        Ok(Self {
            listener: Some(listener),
            tls_acceptor: Some(TlsAcceptor::from(config)),
            connections: ConnectionTable::new(),
            accept_task: None,
        })
    }
}

#[async_trait]
impl ServerTransport for TcpServerTransport {
    async fn start(&mut self, events: mpsc::Sender<ServerEvent>) -> Result<(), TransportError> {
        let listener = self.listener.take().ok_or(TransportError::Closed)?;
        let connections = self.connections.clone();
        let tls_acceptor = self.tls_acceptor.clone();

        self.accept_task = Some(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _addr)) => match &tls_acceptor {
                        Some(acceptor) => match acceptor.accept(stream).await {
                            Ok(stream) => {
                                let (reader, writer) = tokio::io::split(stream);
                                connections.register(reader, writer, events.clone()).await;
                            }
                            Err(e) => tracing::warn!("tls handshake failed: {e}"),
                        },
                        None => {
                            let (reader, writer) = stream.into_split();
                            connections.register(reader, writer, events.clone()).await;
                        }
                    },
                    Err(e) => {
                        tracing::error!("tcp accept error: {e}");
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
        Ok(())
    }
}
