// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! The wire-level Packet: a tagged union over `PacketType`, carried as a
//! single struct with optional per-kind fields.

use reasonchip_core::Cookie;
use serde::{Deserialize, Serialize};

/// The kind of a [`Packet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PacketType {
    /// Worker → broker: announce capacity.
    Register,
    /// Broker → worker: die.
    Shutdown,
    /// Client → broker → worker: run a workflow.
    Run,
    /// Client → broker → worker: cancel a running workflow.
    Cancel,
    /// Worker → broker → client: a workflow's terminal outcome.
    Result,
}

/// The outcome code carried by a RESULT packet (and by synthesized
/// admission/routing/death responses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    Ok,
    BadPacket,
    UnsupportedPacketType,
    NoCapacity,
    NotForUs,
    CookieNotFound,
    CookieCollision,
    WorkerWentAway,
    BrokerWentAway,
    Cancelled,
    Exception,
}

/// A single packet on the wire.
///
/// Every field beyond `packet_type` is optional; which ones are meaningful
/// is determined by `packet_type`. This mirrors the original `SocketPacket`
/// pydantic model field-for-field so
/// the JSON shape (`packet_type, cookie, capacity, workflow, variables,
/// rc, error, stacktrace, result`) is stable across implementations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub packet_type: PacketType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Cookie>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,

    /// JSON-encoded variables object, not a nested value, so workers can
    /// forward it byte-for-byte without re-serializing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rc: Option<ResultCode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Vec<String>>,

    /// JSON-encoded result value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl Packet {
    /// Build a REGISTER packet announcing `capacity`.
    pub fn register(capacity: u32) -> Self {
        Self { capacity: Some(capacity), ..Self::bare(PacketType::Register) }
    }

    /// Build a SHUTDOWN packet.
    pub fn shutdown() -> Self {
        Self::bare(PacketType::Shutdown)
    }

    /// Build a RUN packet dispatching `workflow` under `cookie`.
    pub fn run(cookie: Cookie, workflow: impl Into<String>, variables: Option<String>) -> Self {
        Self {
            cookie: Some(cookie),
            workflow: Some(workflow.into()),
            variables,
            ..Self::bare(PacketType::Run)
        }
    }

    /// Build a CANCEL packet for `cookie`.
    pub fn cancel(cookie: Cookie) -> Self {
        Self { cookie: Some(cookie), ..Self::bare(PacketType::Cancel) }
    }

    /// Build a successful RESULT packet carrying a JSON-encoded `result`.
    pub fn result_ok(cookie: Cookie, result: String) -> Self {
        Self {
            cookie: Some(cookie),
            rc: Some(ResultCode::Ok),
            result: Some(result),
            ..Self::bare(PacketType::Result)
        }
    }

    /// Build a RESULT packet reporting a workflow exception.
    pub fn result_exception(cookie: Cookie, error: impl Into<String>, stacktrace: Vec<String>) -> Self {
        Self {
            cookie: Some(cookie),
            rc: Some(ResultCode::Exception),
            error: Some(error.into()),
            stacktrace: Some(stacktrace),
            ..Self::bare(PacketType::Result)
        }
    }

    /// Build a synthesized terminal RESULT for `rc` with no associated
    /// value (admission failures, death-process synthesis, cancellation).
    pub fn result_terminal(cookie: Cookie, rc: ResultCode, error: Option<String>) -> Self {
        Self { cookie: Some(cookie), rc: Some(rc), error, ..Self::bare(PacketType::Result) }
    }

    fn bare(packet_type: PacketType) -> Self {
        Self {
            packet_type,
            cookie: None,
            capacity: None,
            workflow: None,
            variables: None,
            rc: None,
            error: None,
            stacktrace: None,
            result: None,
        }
    }

    /// Whether the packet carries the fields its `packet_type` requires.
    /// A violation maps to `ResultCode::BadPacket`.
    pub fn is_well_formed(&self) -> bool {
        match self.packet_type {
            PacketType::Register => self.capacity.is_some_and(|c| c >= 1),
            PacketType::Shutdown => true,
            PacketType::Run => self.cookie.is_some() && self.workflow.is_some(),
            PacketType::Cancel => self.cookie.is_some(),
            PacketType::Result => self.cookie.is_some() && self.rc.is_some(),
        }
    }
}

#[cfg(test)]
#[path = "packet_tests.rs"]
mod tests;
