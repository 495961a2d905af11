// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! Frame codec: `uint32 big-endian length | length bytes of UTF-8 JSON`.
//! Decoding errors, short reads, or a closed stream all collapse
//! to [`ProtocolError::ConnectionClosed`] — the caller surfaces a single
//! EOF event upward and stops reading.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::packet::Packet;

/// Default ceiling on a single frame's JSON payload (16 MiB).
pub const DEFAULT_MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Errors from framing or encoding a [`Packet`].
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("frame of {len} bytes exceeds the {max} byte ceiling")]
    FrameTooLarge { len: u32, max: u32 },

    #[error("malformed packet: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => ProtocolError::ConnectionClosed,
            _ => ProtocolError::Io(err),
        }
    }
}

/// Encode a packet to raw JSON bytes (no length prefix).
pub fn encode(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(packet)?)
}

/// Decode a packet from raw JSON bytes.
pub fn decode(bytes: &[u8]) -> Result<Packet, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write a length-prefixed message: 4-byte big-endian length, then the
/// payload.
pub async fn write_message<W>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len())
        .map_err(|_| ProtocolError::FrameTooLarge { len: u32::MAX, max: DEFAULT_MAX_FRAME_LEN })?;

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a length-prefixed message, rejecting frames over `max_len` bytes.
pub async fn read_message<R>(reader: &mut R, max_len: u32) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await?;
    let len = u32::from_be_bytes(len_bytes);

    if len > max_len {
        return Err(ProtocolError::FrameTooLarge { len, max: max_len });
    }

    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Send a packet over a length-prefixed stream.
pub async fn send_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let payload = encode(packet)?;
    write_message(writer, &payload).await
}

/// Receive a packet from a length-prefixed stream, with the default frame
/// ceiling.
pub async fn recv_packet<R>(reader: &mut R) -> Result<Packet, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let payload = read_message(reader, DEFAULT_MAX_FRAME_LEN).await?;
    decode(&payload)
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
