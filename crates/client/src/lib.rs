// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! reasonchip-client: the client-side Multiplexor and logical [`Client`].
//! Carries many concurrent logical requests over one
//! [`reasonchip_transport::ClientTransport`], demultiplexing replies by
//! cookie and running the death process when the transport goes away.

mod connection;
mod error;
mod multiplexor;

pub use connection::{Client, ConnectionId, ConnectionInfo};
pub use error::ClientError;
pub use multiplexor::Multiplexor;
