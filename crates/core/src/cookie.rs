// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! The 128-bit opaque identifier binding a RUN to its RESULT.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a single RUN/RESULT lifetime.
///
/// Generated with UUIDv4, as recommended by the wire protocol. Cookies are
/// `Copy` and cheap to pass around; the wire encoding is the standard
/// hyphenated UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cookie(Uuid);

impl Cookie {
    /// Generate a new random cookie.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID (e.g. one supplied by a CLI `--cookie` flag).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for Cookie {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Cookie {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

impl From<Uuid> for Cookie {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<Cookie> for Uuid {
    fn from(cookie: Cookie) -> Self {
        cookie.0
    }
}
