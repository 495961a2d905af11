// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! reasonchip-transport: the polymorphic connection abstraction
//! and its four wire bindings — unix socket, TCP, gRPC bidi stream, and
//! HTTP streaming POST.

pub mod client;
pub mod dial;
pub mod error;
pub mod grpc;
pub mod http;
pub mod server;
pub mod tcp;
pub mod tls;
pub mod unix;
pub mod url;

pub(crate) mod framed;

pub use client::ClientTransport;
pub use dial::{bind_server, connect_client};
pub use error::TransportError;
pub use server::{ConnectionId, ServerEvent, ServerTransport};
pub use tls::TlsConfig;
pub use url::{Endpoint, Role};
