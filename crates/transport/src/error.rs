// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! Transport-fatal errors: anything
//! that ends a connection outright, as opposed to a per-packet admission
//! or routing outcome carried in a RESULT packet.

/// Errors raised by a [`crate::client::ClientTransport`] or
/// [`crate::server::ServerTransport`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("wire protocol error: {0}")]
    Protocol(#[from] reasonchip_wire::ProtocolError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid transport url {0:?}: {1}")]
    InvalidUrl(String, String),

    #[error("gRPC transport error: {0}")]
    Grpc(#[from] tonic::Status),

    #[error("gRPC transport failed to connect: {0}")]
    GrpcTransport(#[from] tonic::transport::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("connection closed")]
    Closed,

    #[error("not connected")]
    NotConnected,
}
