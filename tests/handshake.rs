mod common;

use std::time::Duration;

use roflcore::ctl::{Connection, State, TimerKind};
use roflcore::ds::error_msg::{ErrorMsg, ErrorType, HelloFailedCode};
use roflcore::ds::hello::{Hello, VersionBitmap};
use roflcore::ds::{OfPayload, Type, Version};
use roflcore::err::ErrorKind;

use common::*;

#[test]
fn hello_carries_local_bitmap() {
    let (mut conn, mut handler) = connection(&[Version::V1_0, Version::V1_2]);
    conn.on_connected(&mut handler);
    let sent = conn.transport().last_sent();
    assert_eq!(3, *sent.header().version());
    match sent.payload() {
        OfPayload::Hello(hello) => assert_eq!(
            Some(&VersionBitmap::from_versions(&[Version::V1_0, Version::V1_2])),
            hello.bitmap()
        ),
        other => panic!("expected HELLO, got {:?}", other),
    }
}

#[test]
fn negotiates_lower_of_pair() {
    let pairs = [
        (Version::V1_0, Version::V1_2),
        (Version::V1_0, Version::V1_3),
        (Version::V1_2, Version::V1_3),
    ];
    for &(a, b) in &pairs {
        // we offer {a, b}, peer only {a}
        let (mut conn, mut handler) = connection(&[a, b]);
        conn.on_connected(&mut handler);
        conn.on_message(&mut handler, &peer_hello(&[a])).unwrap();
        assert_eq!(State::Established, conn.state());
        assert_eq!(Some(a), conn.negotiated_version());
        assert_eq!(vec![a], handler.established);
    }
    for &(a, b) in pairs.iter().filter(|(_, b)| *b == Version::V1_3) {
        // we offer {a}, peer {a, b} with a bitmap
        let (mut conn, mut handler) = connection(&[a]);
        conn.on_connected(&mut handler);
        conn.on_message(&mut handler, &peer_hello(&[a, b])).unwrap();
        assert_eq!(Some(a), conn.negotiated_version());
    }
}

#[test]
fn negotiates_highest_common() {
    let (mut conn, mut handler) = connection(&[Version::V1_0, Version::V1_2, Version::V1_3]);
    conn.on_connected(&mut handler);
    conn.on_message(
        &mut handler,
        &peer_hello(&[Version::V1_0, Version::V1_3, Version::V1_4]),
    ).unwrap();
    assert_eq!(Some(Version::V1_3), conn.negotiated_version());
    assert_eq!(
        Some(VersionBitmap::from_versions(&[Version::V1_0, Version::V1_3, Version::V1_4])),
        conn.peer_versions()
    );
    assert!(!conn.timer_armed(TimerKind::WaitForHello));
    assert!(conn.timer_armed(TimerKind::SendEcho));
}

#[test]
fn bitmap_without_header_version() {
    let (mut conn, mut handler) = connection(&[Version::V1_0, Version::V1_3]);
    conn.on_connected(&mut handler);
    conn.on_message(&mut handler, &hello_frame(4, 1, Some(&[Version::V1_0])))
        .unwrap();
    assert_eq!(Some(Version::V1_0), conn.negotiated_version());
}

#[test]
fn disjoint_versions_fail_with_error() {
    let (mut conn, mut handler) = connection(&[Version::V1_3]);
    conn.on_connected(&mut handler);
    let hello = hello_frame(4, 0x55, Some(&[Version::V1_4]));
    let err = conn.on_message(&mut handler, &hello).unwrap_err();
    assert!(match err.kind() {
        ErrorKind::VersionIncompatible(4) => true,
        _ => false,
    });
    assert_eq!(State::Disconnected, conn.state());
    assert_eq!(None, conn.negotiated_version());
    assert_eq!(1, handler.closed);
    assert_eq!(1, conn.transport().closed);
    assert!(handler.established.is_empty());

    let sent = conn.transport().last_sent();
    assert_eq!(4, *sent.header().version());
    assert_eq!(0x55, *sent.header().xid());
    match sent.payload() {
        OfPayload::Error(error) => {
            assert_eq!(Some(ErrorType::HelloFailed), error.error_type());
            assert_eq!(HelloFailedCode::Incompatible as u16, *error.code());
            assert_eq!(&hello, error.data());
        }
        other => panic!("expected ERROR, got {:?}", other),
    }
}

#[test]
fn excluded_versions_fail_with_eperm() {
    let (mut conn, mut handler) = connection(&[Version::V1_3]);
    conn.on_connected(&mut handler);
    let err = conn
        .on_message(&mut handler, &hello_frame(1, 9, None))
        .unwrap_err();
    assert!(match err.kind() {
        ErrorKind::PermissionDenied(1) => true,
        _ => false,
    });
    let sent = conn.transport().last_sent();
    assert_eq!(1, *sent.header().version());
    match sent.payload() {
        OfPayload::Error(error) => assert_eq!(HelloFailedCode::EPerm as u16, *error.code()),
        other => panic!("expected ERROR, got {:?}", other),
    }
    assert_eq!(State::Disconnected, conn.state());
}

#[test]
fn unknown_header_version_gets_no_error() {
    let (mut conn, mut handler) = connection(&[Version::V1_3]);
    conn.on_connected(&mut handler);
    let frames = conn.transport().sent.len();
    let mut hello = hello_frame(6, 3, None);
    // bitmap {6}
    hello.extend_from_slice(&[0, 1, 0, 8, 0, 0, 0, 0x40]);
    hello[3] = 16;
    assert!(conn.on_message(&mut handler, &hello).is_err());
    assert_eq!(frames, conn.transport().sent.len());
    assert_eq!(State::Disconnected, conn.state());
}

#[test]
fn malformed_hello_disconnects_silently() {
    let (mut conn, mut handler) = connection(&[Version::V1_3]);
    conn.on_connected(&mut handler);
    let frames = conn.transport().sent.len();
    // element length 2 is below the element header
    let hello = [4u8, 0, 0, 16, 0, 0, 0, 1, 0, 1, 0, 2, 0, 0, 0, 0];
    assert!(conn.on_message(&mut handler, &hello[..]).is_err());
    assert_eq!(frames, conn.transport().sent.len());
    assert_eq!(State::Disconnected, conn.state());
    assert_eq!(1, handler.closed);
}

#[test]
fn single_version_fallback() {
    let (mut conn, mut handler) = connection(&[Version::V1_0, Version::V1_2, Version::V1_3]);
    // peer speaks first, before the transport reported the channel
    conn.on_message(&mut handler, &hello_frame(3, 1, None)).unwrap();
    assert_eq!(State::WaitForHello, conn.state());
    assert_eq!(vec![Type::Hello as u8], conn.transport().sent_types());
    assert!(conn.timer_armed(TimerKind::WaitForHello));
    assert_eq!(None, conn.negotiated_version());

    conn.on_message(&mut handler, &hello_frame(3, 2, None)).unwrap();
    assert_eq!(State::Established, conn.state());
    assert_eq!(Some(Version::V1_2), conn.negotiated_version());
    assert_eq!(vec![Version::V1_2], handler.established);
}

#[test]
fn header_1_2_bitmap_ignored() {
    let (mut conn, mut handler) = connection(&[Version::V1_0, Version::V1_2, Version::V1_3]);
    conn.on_connected(&mut handler);
    conn.on_message(&mut handler, &hello_frame(3, 1, Some(&[Version::V1_3])))
        .unwrap();
    assert_eq!(Some(Version::V1_2), conn.negotiated_version());
}

#[test]
fn of10_hello_body_ignored() {
    let (mut conn, mut handler) = connection(&[Version::V1_0, Version::V1_3]);
    conn.on_connected(&mut handler);
    let hello = [1u8, 0, 0, 12, 0, 0, 0, 5, 0xde, 0xad, 0xbe, 0xef];
    conn.on_message(&mut handler, &hello[..]).unwrap();
    assert_eq!(State::Established, conn.state());
    assert_eq!(Some(Version::V1_0), conn.negotiated_version());
    assert_eq!(Some(VersionBitmap::single(1)), conn.peer_versions());
}

#[test]
fn truncated_of10_hello_disconnects() {
    let (mut conn, mut handler) = connection(&[Version::V1_0]);
    conn.on_connected(&mut handler);
    // header claims 12 bytes, 10 arrived
    let hello = [1u8, 0, 0, 12, 0, 0, 0, 5, 0xde, 0xad];
    assert!(conn.on_message(&mut handler, &hello[..]).is_err());
    assert_eq!(State::Disconnected, conn.state());
}

#[test]
fn hello_timeout() {
    let (mut conn, mut handler) = connection(&[Version::V1_3]);
    conn.on_connected(&mut handler);
    advance(&mut conn, &mut handler, Duration::from_secs(4));
    assert_eq!(State::WaitForHello, conn.state());
    advance(&mut conn, &mut handler, Duration::from_secs(1));
    assert_eq!(State::Disconnected, conn.state());
    assert_eq!(1, handler.closed);
    assert_eq!(0, conn.transport().armed_count());
    assert_eq!(0, conn.pending_transactions());
}

#[test]
fn repeated_hello_keeps_established() {
    let (mut conn, mut handler) = connection(&[Version::V1_3]);
    conn.on_connected(&mut handler);
    conn.on_message(&mut handler, &peer_hello(&[Version::V1_3])).unwrap();
    conn.on_message(&mut handler, &peer_hello(&[Version::V1_3])).unwrap();
    assert_eq!(State::Established, conn.state());
    assert_eq!(1, handler.established.len());
    assert_eq!(1, conn.transport().armed_count());
}

fn established() -> (Connection<MockTransport>, Recorder) {
    let (mut conn, mut handler) = connection(&[Version::V1_3]);
    conn.on_connected(&mut handler);
    conn.on_message(&mut handler, &peer_hello(&[Version::V1_3])).unwrap();
    (conn, handler)
}

#[test]
fn echo_timeout_disconnects() {
    let (mut conn, mut handler) = established();
    advance(&mut conn, &mut handler, Duration::from_secs(15));
    let probe = conn.transport().last_sent();
    assert_eq!(Type::EchoRequest as u8, *probe.header().ttype());
    assert_eq!(4, *probe.header().version());
    assert!(conn.timer_armed(TimerKind::WaitForEcho));
    assert!(!conn.timer_armed(TimerKind::SendEcho));

    advance(&mut conn, &mut handler, Duration::from_secs(5));
    assert_eq!(State::Disconnected, conn.state());
    assert_eq!(1, handler.closed);
    assert_eq!(0, conn.transport().armed_count());
}

#[test]
fn echo_reply_in_time() {
    let (mut conn, mut handler) = established();
    advance(&mut conn, &mut handler, Duration::from_secs(15));
    let xid = *conn.transport().last_sent().header().xid();
    advance(&mut conn, &mut handler, Duration::from_secs(3));
    conn.on_message(
        &mut handler,
        &frame(Version::V1_3, xid, OfPayload::EchoReply(Vec::new())),
    ).unwrap();
    assert!(!conn.timer_armed(TimerKind::WaitForEcho));
    assert!(conn.timer_armed(TimerKind::SendEcho));
    assert_eq!(0, conn.pending_transactions());

    advance(&mut conn, &mut handler, Duration::from_secs(5));
    assert_eq!(State::Established, conn.state());
    assert_eq!(0, handler.closed);
}

#[test]
fn echo_reply_with_unknown_xid_ignored() {
    let (mut conn, mut handler) = established();
    advance(&mut conn, &mut handler, Duration::from_secs(15));
    let xid = *conn.transport().last_sent().header().xid();
    conn.on_message(
        &mut handler,
        &frame(Version::V1_3, xid + 100, OfPayload::EchoReply(Vec::new())),
    ).unwrap();
    assert!(conn.timer_armed(TimerKind::WaitForEcho));
}

#[test]
fn echo_request_answered() {
    let (mut conn, mut handler) = connection(&[Version::V1_3]);
    conn.on_connected(&mut handler);
    // answered even before the handshake completed
    conn.on_message(
        &mut handler,
        &frame(Version::V1_3, 42, OfPayload::EchoRequest(vec![1, 2, 3])),
    ).unwrap();
    let reply = conn.transport().last_sent();
    assert_eq!(42, *reply.header().xid());
    assert_eq!(&OfPayload::EchoReply(vec![1, 2, 3]), reply.payload());
}

#[test]
fn messages_dropped_before_established() {
    let (mut conn, mut handler) = connection(&[Version::V1_3]);
    conn.on_connected(&mut handler);
    conn.on_message(&mut handler, &barrier_reply(Version::V1_3, 5)).unwrap();
    assert!(handler.messages.is_empty());

    conn.on_message(&mut handler, &peer_hello(&[Version::V1_3])).unwrap();
    conn.on_message(&mut handler, &barrier_reply(Version::V1_3, 5)).unwrap();
    assert_eq!(1, handler.messages.len());
    assert_eq!(
        &OfPayload::Raw(Type::BarrierReply, Vec::new()),
        handler.messages[0].payload()
    );
}

#[test]
fn request_completed_by_reply() {
    let (mut conn, mut handler) = established();
    let xid = conn
        .send_request(OfPayload::Raw(Type::BarrierRequest, Vec::new()))
        .unwrap();
    assert_eq!(1, conn.pending_transactions());
    conn.on_message(&mut handler, &barrier_reply(Version::V1_3, xid)).unwrap();
    assert_eq!(0, conn.pending_transactions());
}

#[test]
fn peer_hello_failed_closes_while_waiting() {
    let (mut conn, mut handler) = connection(&[Version::V1_3]);
    conn.on_connected(&mut handler);
    let error = ErrorMsg::hello_failed(HelloFailedCode::Incompatible, Vec::new());
    conn.on_message(&mut handler, &frame(Version::V1_3, 1, OfPayload::Error(error)))
        .unwrap();
    assert_eq!(1, handler.errors.len());
    assert_eq!(State::Disconnected, conn.state());
}

#[test]
fn reconnect_after_close() {
    let (mut conn, mut handler) = established();
    conn.on_closed(&mut handler);
    assert_eq!(State::Disconnected, conn.state());
    assert_eq!(None, conn.peer_versions());
    conn.on_connected(&mut handler);
    assert_eq!(State::WaitForHello, conn.state());
    let sent = conn.transport().last_sent();
    assert_eq!(
        &OfPayload::Hello(Hello::new(Some(VersionBitmap::single(4)))),
        sent.payload()
    );
    conn.on_message(&mut handler, &peer_hello(&[Version::V1_3])).unwrap();
    assert_eq!(2, handler.established.len());
}
