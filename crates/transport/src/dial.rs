// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! Factory functions turning a parsed [`Endpoint`] into a boxed
//! [`ClientTransport`] or [`ServerTransport`]. Callers resolve the
//! URL once with [`Endpoint::parse`] and hand it here rather than
//! matching on scheme themselves; this is the one place that knows
//! which binding backs which scheme.

use std::net::{SocketAddr, ToSocketAddrs};

use crate::client::ClientTransport;
use crate::error::TransportError;
use crate::grpc::{GrpcClientTransport, GrpcServerTransport};
use crate::http::{HttpClientTransport, HttpServerTransport};
use crate::server::ServerTransport;
use crate::tcp::{TcpClientTransport, TcpServerTransport};
use crate::tls::TlsConfig;
use crate::unix::{UnixClientTransport, UnixServerTransport};
use crate::url::Endpoint;

/// Dial `endpoint`, wrapping in TLS when `tls` is given (ignored for
/// `socket://` and `http://`, neither of which this dials with rustls
/// directly — unix sockets are local-only and HTTP uses `reqwest`'s own
/// TLS stack).
pub async fn connect_client(endpoint: &Endpoint, tls: Option<&TlsConfig>) -> Result<Box<dyn ClientTransport>, TransportError> {
    match endpoint {
        Endpoint::Socket(path) => Ok(Box::new(UnixClientTransport::connect(path).await?)),

        Endpoint::Tcp { host, port } => match tls {
            Some(tls) => Ok(Box::new(TcpClientTransport::connect_tls(host, *port, tls).await?)),
            None => Ok(Box::new(TcpClientTransport::connect(host, *port).await?)),
        },

        Endpoint::Grpc { host, port } => {
            let scheme = if tls.is_some() { "https" } else { "http" };
            let url = format!("{scheme}://{host}:{port}");
            Ok(Box::new(GrpcClientTransport::connect(url, tls).await?))
        }

        Endpoint::Http(url) => Ok(Box::new(HttpClientTransport::new(url.clone()))),
    }
}

/// Bind a listener for `endpoint`, wrapping in TLS when `tls` is given
/// (ignored for `socket://`, which has no transport-level TLS; `http://`
/// terminates TLS in-process via `axum-server`'s rustls acceptor).
pub async fn bind_server(endpoint: &Endpoint, tls: Option<&TlsConfig>) -> Result<Box<dyn ServerTransport>, TransportError> {
    match endpoint {
        Endpoint::Socket(path) => Ok(Box::new(UnixServerTransport::bind(path)?)),

        Endpoint::Tcp { host, port } => match tls {
            Some(tls) => Ok(Box::new(TcpServerTransport::bind_tls((host.as_str(), *port), tls).await?)),
            None => Ok(Box::new(TcpServerTransport::bind((host.as_str(), *port)).await?)),
        },

        Endpoint::Grpc { host, port } => {
            let addr = socket_addr(host, *port)?;
            match tls {
                Some(tls) => Ok(Box::new(GrpcServerTransport::with_tls(addr, tls.clone()))),
                None => Ok(Box::new(GrpcServerTransport::new(addr))),
            }
        }

        Endpoint::Http(url) => {
            let addr = http_socket_addr(url)?;
            match tls {
                Some(tls) => Ok(Box::new(HttpServerTransport::with_tls(addr, tls.clone()))),
                None => Ok(Box::new(HttpServerTransport::new(addr))),
            }
        }
    }
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| TransportError::InvalidUrl(format!("{host}:{port}"), "could not resolve host".to_string()))
}

/// `HttpServerTransport` binds a plain `SocketAddr`; recover the
/// host/port `axum`/`tokio::net::TcpListener` should listen on from the
/// URL a client would `POST` to.
fn http_socket_addr(url: &str) -> Result<SocketAddr, TransportError> {
    let invalid = || TransportError::InvalidUrl(url.to_string(), "could not determine listen address".to_string());

    let rest = url.split_once("://").map(|(_, rest)| rest).ok_or_else(invalid)?;
    let authority = rest.split('/').next().ok_or_else(invalid)?;
    let (host, port) = authority.rsplit_once(':').ok_or_else(invalid)?;
    let port: u16 = port.parse().map_err(|_| invalid())?;
    socket_addr(host, port)
}
