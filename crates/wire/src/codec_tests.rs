// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

use super::*;
use crate::packet::{PacketType, ResultCode};
use proptest::prelude::*;
use reasonchip_core::Cookie;
use std::io::Cursor;

#[tokio::test]
async fn write_then_read_round_trips_the_payload() {
    let mut buf = Vec::new();
    write_message(&mut buf, b"hello").await.expect("write");

    let mut cursor = Cursor::new(buf);
    let out = read_message(&mut cursor, DEFAULT_MAX_FRAME_LEN).await.expect("read");
    assert_eq!(out, b"hello");
}

#[tokio::test]
async fn write_message_prepends_a_four_byte_big_endian_length() {
    let mut buf = Vec::new();
    write_message(&mut buf, b"abc").await.expect("write");

    assert_eq!(&buf[..4], &[0, 0, 0, 3]);
    assert_eq!(&buf[4..], b"abc");
}

#[tokio::test]
async fn send_then_recv_round_trips_a_packet() {
    let cookie = Cookie::new();
    let packet = Packet::run(cookie, "pkg.hello", Some("{}".to_string()));

    let mut buf = Vec::new();
    send_packet(&mut buf, &packet).await.expect("send");

    let mut cursor = Cursor::new(buf);
    let decoded = recv_packet(&mut cursor).await.expect("recv");
    assert_eq!(decoded, packet);
}

#[tokio::test]
async fn read_message_rejects_frames_over_the_ceiling() {
    let mut buf = Vec::new();
    write_message(&mut buf, &vec![0u8; 100]).await.expect("write");

    let mut cursor = Cursor::new(buf);
    let err = read_message(&mut cursor, 10).await.unwrap_err();
    assert!(matches!(err, ProtocolError::FrameTooLarge { len: 100, max: 10 }));
}

#[tokio::test]
async fn read_message_on_an_empty_stream_reports_connection_closed() {
    let mut cursor = Cursor::new(Vec::new());
    let err = read_message(&mut cursor, DEFAULT_MAX_FRAME_LEN).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn read_message_on_a_truncated_payload_reports_connection_closed() {
    let mut buf = Vec::new();
    write_message(&mut buf, b"hello world").await.expect("write");
    buf.truncate(6);

    let mut cursor = Cursor::new(buf);
    let err = read_message(&mut cursor, DEFAULT_MAX_FRAME_LEN).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[test]
fn decode_rejects_malformed_json() {
    let err = decode(b"not json").unwrap_err();
    assert!(matches!(err, ProtocolError::Json(_)));
}

fn arb_cookie() -> impl Strategy<Value = Cookie> {
    any::<u128>().prop_map(|bits| Cookie::from_uuid(uuid::Uuid::from_u128(bits)))
}

fn arb_text() -> impl Strategy<Value = String> {
    ".{0,40}"
}

fn arb_workflow() -> impl Strategy<Value = String> {
    "[a-z]{1,8}(\\.[a-z]{1,8}){0,3}"
}

fn arb_result_code() -> impl Strategy<Value = ResultCode> {
    prop_oneof![
        Just(ResultCode::Ok),
        Just(ResultCode::BadPacket),
        Just(ResultCode::UnsupportedPacketType),
        Just(ResultCode::NoCapacity),
        Just(ResultCode::NotForUs),
        Just(ResultCode::CookieNotFound),
        Just(ResultCode::CookieCollision),
        Just(ResultCode::WorkerWentAway),
        Just(ResultCode::BrokerWentAway),
        Just(ResultCode::Cancelled),
        Just(ResultCode::Exception),
    ]
}

/// A well-formed `Packet` of any `PacketType`, respecting each kind's
/// required-field rules from [`Packet::is_well_formed`].
fn arb_packet() -> impl Strategy<Value = Packet> {
    prop_oneof![
        (1u32..1000).prop_map(Packet::register),
        Just(Packet::shutdown()),
        (arb_cookie(), arb_workflow(), proptest::option::of(arb_text()))
            .prop_map(|(cookie, workflow, variables)| Packet::run(cookie, workflow, variables)),
        arb_cookie().prop_map(Packet::cancel),
        (
            arb_cookie(),
            arb_result_code(),
            proptest::option::of(arb_text()),
            proptest::option::of(prop::collection::vec(arb_text(), 0..4)),
            proptest::option::of(arb_text()),
        )
            .prop_map(|(cookie, rc, error, stacktrace, result)| Packet {
                packet_type: PacketType::Result,
                cookie: Some(cookie),
                capacity: None,
                workflow: None,
                variables: None,
                rc: Some(rc),
                error,
                stacktrace,
                result,
            }),
    ]
}

proptest! {
    // P6: every well-formed packet survives an encode/decode round trip
    // byte-for-byte equal, including multi-byte UTF-8 in free-text fields
    // and an empty stacktrace.
    #[test]
    fn well_formed_packets_round_trip_through_encode_and_decode(packet in arb_packet()) {
        prop_assert!(packet.is_well_formed());
        let bytes = encode(&packet).unwrap();
        let decoded = decode(&bytes).unwrap();
        prop_assert_eq!(decoded, packet);
    }
}
