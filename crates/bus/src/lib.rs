// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! reasonchip-bus: the AMQP-backed alternative to a broker connection.
//! A worker can attach to a topic exchange instead of dialling a
//! broker; a client can dispatch a RUN directly onto the same exchange.
//! Built on `lapin`.

mod consumer;
mod error;
mod producer;

pub use consumer::{AckOnEmit, BusConsumer};
pub use error::BusError;
pub use producer::BusProducer;
