// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! HTTP streaming binding: a single fixed path `POST
//! /v1/stream/stream`. The request body is one packet (the initial RUN);
//! the response body is `application/octet-stream` carrying one JSON
//! packet per line, terminated after the first RESULT packet for the
//! originating cookie. Every response carries an `X-Process-Time` header
//! in microseconds, and CORS is wide open by default.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use reasonchip_wire::{Packet, PacketType};
use tokio::sync::mpsc;

use crate::client::ClientTransport;
use crate::error::TransportError;
use crate::server::{ConnectionId, ServerEvent, ServerTransport};
use crate::tls::TlsConfig;

pub const STREAM_PATH: &str = "/v1/stream/stream";

/// One streaming-POST round trip, client side.
///
/// `connect` takes no action beyond recording the endpoint URL: each
/// logical HTTP "connection" is really its own request, so the actual
/// POST happens on the first `send`.
pub struct HttpClientTransport {
    http: reqwest::Client,
    url: String,
    lines: Option<LineStream>,
}

struct LineStream {
    body: Pin<Box<dyn Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>,
    buf: Vec<u8>,
}

impl HttpClientTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), url: url.into(), lines: None }
    }

    async fn next_line(&mut self) -> Result<Option<Packet>, TransportError> {
        let stream = match &mut self.lines {
            Some(s) => s,
            None => return Ok(None),
        };

        loop {
            if let Some(pos) = stream.buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = stream.buf.drain(..=pos).collect();
                let line = &line[..line.len() - 1];
                if line.is_empty() {
                    continue;
                }
                let packet: Packet = serde_json::from_slice(line)?;
                return Ok(Some(packet));
            }

            match stream.body.next().await {
                Some(Ok(chunk)) => stream.buf.extend_from_slice(&chunk),
                Some(Err(e)) => return Err(TransportError::Http(e)),
                None => {
                    self.lines = None;
                    return Ok(None);
                }
            }
        }
    }
}

#[async_trait]
impl ClientTransport for HttpClientTransport {
    async fn send(&mut self, packet: Packet) -> Result<(), TransportError> {
        let response = self.http.post(&self.url).json(&packet).send().await?;
        let body = response.bytes_stream();
        self.lines = Some(LineStream { body: Box::pin(body), buf: Vec::new() });
        Ok(())
    }

    async fn recv(&mut self) -> Result<Packet, TransportError> {
        self.next_line().await?.ok_or(TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.lines = None;
        Ok(())
    }
}

/// Per-connection outbound channel the handler drains into the response
/// body, closed once a RESULT packet for the connection's cookie has
/// been written.
struct HttpConnection {
    outbox: mpsc::UnboundedSender<Packet>,
}

#[derive(Clone, Default)]
struct HttpState {
    connections: Arc<Mutex<HashMap<ConnectionId, HttpConnection>>>,
    events: Arc<Mutex<Option<mpsc::Sender<ServerEvent>>>>,
}

/// An HTTP listener exposing `POST /v1/stream/stream`, optionally
/// behind TLS terminated in-process via `axum-server`'s rustls
/// acceptor (the same `rustls::ServerConfig` — and so the same
/// cert/key/mTLS options — as every other binding's [`TlsConfig`]).
pub struct HttpServerTransport {
    addr: SocketAddr,
    tls: Option<TlsConfig>,
    state: HttpState,
    serve_task: Option<tokio::task::JoinHandle<()>>,
}

impl HttpServerTransport {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, tls: None, state: HttpState::default(), serve_task: None }
    }

    pub fn with_tls(addr: SocketAddr, tls: TlsConfig) -> Self {
        Self { addr, tls: Some(tls), state: HttpState::default(), serve_task: None }
    }
}

#[async_trait]
impl ServerTransport for HttpServerTransport {
    async fn start(&mut self, events: mpsc::Sender<ServerEvent>) -> Result<(), TransportError> {
        *self.state.events.lock() = Some(events);

        let app = Router::new()
            .route(STREAM_PATH, post(handle_stream))
            .layer(middleware::from_fn(process_time_header))
            .layer(tower_http::cors::CorsLayer::permissive())
            .with_state(self.state.clone());

        let addr = self.addr;

        match &self.tls {
            Some(tls) => {
                let rustls_config = axum_server::tls_rustls::RustlsConfig::from_config(tls.server_config()?);
                self.serve_task = Some(tokio::spawn(async move {
                    let result = axum_server::bind_rustls(addr, rustls_config)
                        .serve(app.into_make_service())
                        .await;
                    if let Err(e) = result {
                        tracing::error!("http transport server error: {e}");
                    }
                }));
            }
            None => {
                let listener = tokio::net::TcpListener::bind(addr).await?;
                self.serve_task = Some(tokio::spawn(async move {
                    if let Err(e) = axum::serve(listener, app).await {
                        tracing::error!("http transport server error: {e}");
                    }
                }));
            }
        }

        Ok(())
    }

    async fn send(&self, id: ConnectionId, packet: Packet) -> Result<(), TransportError> {
        let table = self.state.connections.lock();
        let conn = table.get(&id).ok_or(TransportError::Closed)?;
        conn.outbox.send(packet).map_err(|_| TransportError::Closed)
    }

    async fn close(&self, id: ConnectionId) -> Result<(), TransportError> {
        self.state.connections.lock().remove(&id);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TransportError> {
        if let Some(task) = self.serve_task.take() {
            task.abort();
        }
        self.state.connections.lock().clear();
        Ok(())
    }
}

async fn process_time_header(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let mut response = next.run(request).await;
    let micros = start.elapsed().as_micros();
    if let Ok(value) = HeaderValue::from_str(&micros.to_string()) {
        response.headers_mut().insert("X-Process-Time", value);
    }
    response
}

/// Handle one `POST /v1/stream/stream`: the body is the initial RUN
/// packet, the response streams every packet routed back to this
/// connection until (and including) the first RESULT.
async fn handle_stream(State(state): State<HttpState>, Json(initial): Json<Packet>) -> Response {
    let id = ConnectionId::new();
    let (outbox, mut inbox) = mpsc::unbounded_channel::<Packet>();

    state.connections.lock().insert(id, HttpConnection { outbox });

    let events = state.events.lock().clone();
    if let Some(events) = &events {
        let _ = events.send(ServerEvent::Connected(id)).await;
        let _ = events.send(ServerEvent::Packet(id, initial)).await;
    }

    let connections = state.connections.clone();
    let events_for_close = events.clone();

    let body_stream = async_stream::stream! {
        while let Some(packet) = inbox.recv().await {
            let terminal = packet.packet_type == PacketType::Result;
            let mut line = match serde_json::to_vec(&packet) {
                Ok(bytes) => bytes,
                Err(_) => break,
            };
            line.push(b'\n');
            yield Ok::<_, std::io::Error>(bytes::Bytes::from(line));
            if terminal {
                break;
            }
        }
        connections.lock().remove(&id);
        if let Some(events) = &events_for_close {
            let _ = events.send(ServerEvent::Disconnected(id)).await;
        }
    };

    match Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/octet-stream")
        .body(Body::from_stream(body_stream))
    {
        Ok(response) => response,
        Err(_) => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}
