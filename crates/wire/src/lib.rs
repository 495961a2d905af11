// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! reasonchip-wire: the on-the-wire [`Packet`] shape and its
//! length-prefixed JSON frame codec, shared by every transport binding.

pub mod codec;
pub mod packet;

pub use codec::{
    decode, encode, read_message, recv_packet, send_packet, write_message, ProtocolError,
    DEFAULT_MAX_FRAME_LEN,
};
pub use packet::{Packet, PacketType, ResultCode};
