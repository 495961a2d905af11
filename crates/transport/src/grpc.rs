// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! gRPC binding: a single bidirectional streaming RPC (`Stream`) is one
//! logical connection. `WirePacket` mirrors `Packet`
//! field-for-field; conversion between the two is the only thing this
//! module adds beyond wiring tonic up to the [`ClientTransport`] /
//! [`ServerTransport`] contracts.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use reasonchip_wire::{Packet, PacketType, ResultCode};
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, UnboundedReceiverStream};
use tonic::{transport::Channel, transport::Server, Request, Response, Status, Streaming};

use crate::client::ClientTransport;
use crate::error::TransportError;
use crate::server::{ConnectionId, ServerEvent, ServerTransport};
use crate::tls::TlsConfig;

pub mod proto {
    tonic::include_proto!("reasonchip.wire");
}

use proto::wire_transport_client::WireTransportClient;
use proto::wire_transport_server::{WireTransport, WireTransportServer};
use proto::WirePacket;

impl From<&Packet> for WirePacket {
    fn from(p: &Packet) -> Self {
        WirePacket {
            packet_type: format!("{:?}", p.packet_type).to_uppercase(),
            cookie: p.cookie.map(|c| c.to_string()),
            capacity: p.capacity,
            workflow: p.workflow.clone(),
            variables: p.variables.clone(),
            rc: p.rc.map(|rc| format!("{rc:?}").to_uppercase()),
            error: p.error.clone(),
            stacktrace: p.stacktrace.clone().unwrap_or_default(),
            result: p.result.clone(),
        }
    }
}

impl TryFrom<WirePacket> for Packet {
    type Error = TransportError;

    fn try_from(w: WirePacket) -> Result<Self, Self::Error> {
        let packet_type = parse_packet_type(&w.packet_type)
            .ok_or_else(|| TransportError::InvalidUrl(w.packet_type.clone(), "unknown packet_type".into()))?;

        let cookie = w
            .cookie
            .map(|c| c.parse())
            .transpose()
            .map_err(|_| TransportError::InvalidUrl(w.packet_type.clone(), "malformed cookie".into()))?;

        let rc = w.rc.as_deref().and_then(parse_result_code);

        Ok(Packet {
            packet_type,
            cookie,
            capacity: w.capacity,
            workflow: w.workflow,
            variables: w.variables,
            rc,
            error: w.error,
            stacktrace: if w.stacktrace.is_empty() { None } else { Some(w.stacktrace) },
            result: w.result,
        })
    }
}

fn parse_packet_type(s: &str) -> Option<PacketType> {
    match s {
        "REGISTER" => Some(PacketType::Register),
        "SHUTDOWN" => Some(PacketType::Shutdown),
        "RUN" => Some(PacketType::Run),
        "CANCEL" => Some(PacketType::Cancel),
        "RESULT" => Some(PacketType::Result),
        _ => None,
    }
}

fn parse_result_code(s: &str) -> Option<ResultCode> {
    match s {
        "OK" => Some(ResultCode::Ok),
        "BAD_PACKET" => Some(ResultCode::BadPacket),
        "UNSUPPORTED_PACKET_TYPE" => Some(ResultCode::UnsupportedPacketType),
        "NO_CAPACITY" => Some(ResultCode::NoCapacity),
        "NOT_FOR_US" => Some(ResultCode::NotForUs),
        "COOKIE_NOT_FOUND" => Some(ResultCode::CookieNotFound),
        "COOKIE_COLLISION" => Some(ResultCode::CookieCollision),
        "WORKER_WENT_AWAY" => Some(ResultCode::WorkerWentAway),
        "BROKER_WENT_AWAY" => Some(ResultCode::BrokerWentAway),
        "CANCELLED" => Some(ResultCode::Cancelled),
        "EXCEPTION" => Some(ResultCode::Exception),
        _ => None,
    }
}

/// One bidi gRPC stream, client side.
pub struct GrpcClientTransport {
    outbound: Option<mpsc::Sender<WirePacket>>,
    inbound: Streaming<WirePacket>,
}

impl GrpcClientTransport {
    pub async fn connect(url: impl Into<String>, tls: Option<&TlsConfig>) -> Result<Self, TransportError> {
        let mut endpoint = Channel::from_shared(url.into())
            .map_err(|e| TransportError::InvalidUrl(String::new(), e.to_string()))?;

        if let Some(tls) = tls {
            endpoint = endpoint.tls_config(tls.tonic_client_config()?)?;
        }

        let channel = endpoint.connect().await?;
        let mut client = WireTransportClient::new(channel);

        let (tx, rx) = mpsc::channel::<WirePacket>(32);
        let response = client.stream(ReceiverStream::new(rx)).await?;

        Ok(Self { outbound: Some(tx), inbound: response.into_inner() })
    }
}

#[async_trait]
impl ClientTransport for GrpcClientTransport {
    async fn send(&mut self, packet: Packet) -> Result<(), TransportError> {
        let sender = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        sender.send(WirePacket::from(&packet)).await.map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Result<Packet, TransportError> {
        match self.inbound.message().await? {
            Some(wire) => Packet::try_from(wire),
            None => Err(TransportError::Closed),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.outbound.take();
        Ok(())
    }
}

struct ConnectionHandle {
    outbox: mpsc::UnboundedSender<Packet>,
    abort: tokio::task::JoinHandle<()>,
}

#[derive(Clone, Default)]
struct ConnectionTable(Arc<Mutex<HashMap<ConnectionId, ConnectionHandle>>>);

#[derive(Clone)]
struct WireService {
    connections: ConnectionTable,
    events: mpsc::Sender<ServerEvent>,
}

type PacketStream = Pin<Box<dyn Stream<Item = Result<WirePacket, Status>> + Send + 'static>>;

#[tonic::async_trait]
impl WireTransport for WireService {
    type StreamStream = PacketStream;

    async fn stream(
        &self,
        request: Request<Streaming<WirePacket>>,
    ) -> Result<Response<Self::StreamStream>, Status> {
        let id = ConnectionId::new();
        let mut inbound = request.into_inner();
        let (outbox, mut response_rx) = mpsc::unbounded_channel::<Packet>();

        let _ = self.events.send(ServerEvent::Connected(id)).await;

        let events = self.events.clone();
        let abort = tokio::spawn(async move {
            while let Some(next) = inbound.next().await {
                let wire = match next {
                    Ok(wire) => wire,
                    Err(_) => break,
                };
                let packet = match Packet::try_from(wire) {
                    Ok(p) => p,
                    Err(_) => break,
                };
                if events.send(ServerEvent::Packet(id, packet)).await.is_err() {
                    break;
                }
            }
            let _ = events.send(ServerEvent::Disconnected(id)).await;
        });

        self.connections.0.lock().insert(id, ConnectionHandle { outbox, abort });

        let out = async_stream_adapter(&mut response_rx);
        Ok(Response::new(Box::pin(out)))
    }
}

/// Adapts a packet receiver into a gRPC response stream of `WirePacket`s.
fn async_stream_adapter(
    rx: &mut mpsc::UnboundedReceiver<Packet>,
) -> impl Stream<Item = Result<WirePacket, Status>> + Send + 'static {
    let rx = std::mem::replace(rx, mpsc::unbounded_channel().1);
    UnboundedReceiverStream::new(rx).map(|packet| Ok(WirePacket::from(&packet)))
}

/// A gRPC listener accepting many bidi streams, one per peer connection.
pub struct GrpcServerTransport {
    addr: std::net::SocketAddr,
    tls: Option<TlsConfig>,
    connections: ConnectionTable,
    serve_task: Option<tokio::task::JoinHandle<()>>,
}

impl GrpcServerTransport {
    pub fn new(addr: std::net::SocketAddr) -> Self {
        Self { addr, tls: None, connections: ConnectionTable::default(), serve_task: None }
    }

    pub fn with_tls(addr: std::net::SocketAddr, tls: TlsConfig) -> Self {
        Self { addr, tls: Some(tls), connections: ConnectionTable::default(), serve_task: None }
    }
}

#[async_trait]
impl ServerTransport for GrpcServerTransport {
    async fn start(&mut self, events: mpsc::Sender<ServerEvent>) -> Result<(), TransportError> {
        let service = WireService { connections: self.connections.clone(), events };
        let addr = self.addr;

        let mut builder = Server::builder();
        if let Some(tls) = &self.tls {
            builder = builder.tls_config(tls.tonic_server_config()?)?;
        }

        self.serve_task = Some(tokio::spawn(async move {
            if let Err(e) = builder.add_service(WireTransportServer::new(service)).serve(addr).await {
                tracing::error!("gRPC server error: {e}");
            }
        }));

        Ok(())
    }

    async fn send(&self, id: ConnectionId, packet: Packet) -> Result<(), TransportError> {
        let table = self.connections.0.lock();
        let handle = table.get(&id).ok_or(TransportError::Closed)?;
        handle.outbox.send(packet).map_err(|_| TransportError::Closed)
    }

    async fn close(&self, id: ConnectionId) -> Result<(), TransportError> {
        if let Some(handle) = self.connections.0.lock().remove(&id) {
            handle.abort.abort();
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TransportError> {
        if let Some(task) = self.serve_task.take() {
            task.abort();
        }
        for (_, handle) in self.connections.0.lock().drain() {
            handle.abort.abort();
        }
        Ok(())
    }
}
