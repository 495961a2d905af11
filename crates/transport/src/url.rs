// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! Transport endpoint URLs: `socket://`, `tcp://`, `grpc://`, and
//! `http://`/`https://`, each with a role-dependent default port.

use std::path::PathBuf;

use crate::error::TransportError;

/// Default listener/dial side a URL is being resolved for — worker-facing
/// ports differ from client-facing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Worker,
}

pub const DEFAULT_CLIENT_PORT_TCP: u16 = 51500;
pub const DEFAULT_CLIENT_PORT_GRPC: u16 = 51501;
pub const DEFAULT_CLIENT_PORT_HTTP: u16 = 51502;
pub const DEFAULT_WORKER_PORT_TCP: u16 = 51510;
pub const DEFAULT_WORKER_PORT_GRPC: u16 = 51511;

pub const DEFAULT_WORKER_SOCKET_PATH: &str = "/tmp/reasonchip-broker-worker.sock";
pub const DEFAULT_CLIENT_SOCKET_PATH: &str = "/tmp/reasonchip-broker-client.sock";

/// A parsed transport endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Socket(PathBuf),
    Tcp { host: String, port: u16 },
    Grpc { host: String, port: u16 },
    Http(String),
}

impl Endpoint {
    /// Parse a transport URL for the given `role`, falling back to the
    /// role-appropriate default port when the URL omits one.
    pub fn parse(raw: &str, role: Role) -> Result<Self, TransportError> {
        let invalid = |reason: &str| TransportError::InvalidUrl(raw.to_string(), reason.to_string());

        let (scheme, rest) = raw.split_once("://").ok_or_else(|| invalid("missing scheme"))?;

        match scheme {
            "socket" | "unix" => Ok(Endpoint::Socket(PathBuf::from(rest))),

            "tcp" => {
                let (host, port) = split_host_port(rest, default_port(role, scheme))
                    .ok_or_else(|| invalid("missing host"))?;
                Ok(Endpoint::Tcp { host, port })
            }

            "grpc" => {
                let (host, port) = split_host_port(rest, default_port(role, scheme))
                    .ok_or_else(|| invalid("missing host"))?;
                Ok(Endpoint::Grpc { host, port })
            }

            "http" | "https" => Ok(Endpoint::Http(raw.to_string())),

            other => Err(invalid(&format!("unsupported scheme {other:?}"))),
        }
    }
}

fn default_port(role: Role, scheme: &str) -> u16 {
    match (role, scheme) {
        (Role::Client, "tcp") => DEFAULT_CLIENT_PORT_TCP,
        (Role::Client, "grpc") => DEFAULT_CLIENT_PORT_GRPC,
        (Role::Worker, "tcp") => DEFAULT_WORKER_PORT_TCP,
        (Role::Worker, "grpc") => DEFAULT_WORKER_PORT_GRPC,
        _ => DEFAULT_CLIENT_PORT_TCP,
    }
}

fn split_host_port(rest: &str, default_port: u16) -> Option<(String, u16)> {
    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return None;
    }

    match rest.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port = port.parse().ok()?;
            Some((host.to_string(), port))
        }
        _ => Some((rest.to_string(), default_port)),
    }
}
