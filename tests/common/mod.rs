#![allow(dead_code)]

use std::convert::TryFrom;
use std::time::Duration;

use roflcore::ctl::{Connection, ConnectionConfig, ConnectionHandler, TimerHandle, TimerKind, Transport};
use roflcore::ds::error_msg::ErrorMsg;
use roflcore::ds::hello::{Hello, VersionBitmap};
use roflcore::ds::{Header, OfMsg, OfPayload, Pack, Type, Version};
use roflcore::err::Result;

/// Transport recording sent frames, with timers on a simulated clock.
#[derive(Default)]
pub struct MockTransport {
    pub sent: Vec<Vec<u8>>,
    pub closed: usize,
    now: Duration,
    next_handle: u64,
    timers: Vec<(TimerHandle, TimerKind, Duration)>,
}

impl MockTransport {
    pub fn armed(&self, kind: TimerKind) -> Option<TimerHandle> {
        self.timers
            .iter()
            .find(|(_, k, _)| *k == kind)
            .map(|(h, _, _)| *h)
    }

    pub fn armed_count(&self) -> usize {
        self.timers.len()
    }

    pub fn last_sent(&self) -> OfMsg {
        OfMsg::try_from(&self.sent[self.sent.len() - 1][..]).unwrap()
    }

    pub fn sent_types(&self) -> Vec<u8> {
        self.sent.iter().map(|frame| frame[1]).collect()
    }

    fn pop_due(&mut self) -> Option<TimerHandle> {
        let now = self.now;
        let due = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, (_, _, deadline))| *deadline <= now)
            .min_by_key(|(_, (_, _, deadline))| *deadline)
            .map(|(idx, _)| idx)?;
        Some(self.timers.remove(due).0)
    }
}

impl Transport for MockTransport {
    fn send(&mut self, frame: Vec<u8>) -> Result<()> {
        self.sent.push(frame);
        Ok(())
    }

    fn close(&mut self) {
        self.closed += 1;
    }

    fn schedule_timer(&mut self, kind: TimerKind, after: Duration) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.timers.push((handle, kind, self.now + after));
        handle
    }

    fn cancel_timer(&mut self, handle: TimerHandle) {
        self.timers.retain(|(h, _, _)| *h != handle);
    }
}

/// Moves the clock forward, firing due timers in deadline order.
pub fn advance<H: ConnectionHandler<MockTransport>>(
    conn: &mut Connection<MockTransport>,
    handler: &mut H,
    by: Duration,
) {
    conn.transport_mut().now += by;
    while let Some(handle) = conn.transport_mut().pop_due() {
        conn.on_timeout(handler, handle);
    }
}

#[derive(Default)]
pub struct Recorder {
    pub established: Vec<Version>,
    pub closed: usize,
    pub messages: Vec<OfMsg>,
    pub errors: Vec<(Header, ErrorMsg)>,
}

impl ConnectionHandler<MockTransport> for Recorder {
    fn on_message_received(&mut self, _conn: &mut Connection<MockTransport>, msg: OfMsg) {
        self.messages.push(msg);
    }

    fn on_connection_established(&mut self, _conn: &mut Connection<MockTransport>, version: Version) {
        self.established.push(version);
    }

    fn on_connection_closed(&mut self, _conn: &mut Connection<MockTransport>) {
        self.closed += 1;
    }

    fn on_error_received(&mut self, _conn: &mut Connection<MockTransport>, header: &Header, error: &ErrorMsg) {
        self.errors.push((header.clone(), error.clone()));
    }
}

pub fn connection(versions: &[Version]) -> (Connection<MockTransport>, Recorder) {
    let _ = simple_logger::init();
    let config = ConnectionConfig::default().with_versions(VersionBitmap::from_versions(versions));
    (
        Connection::new(MockTransport::default(), config),
        Recorder::default(),
    )
}

/// HELLO frame with the given header version and optional bitmap.
pub fn hello_frame(header_version: u8, xid: u32, bitmap: Option<&[Version]>) -> Vec<u8> {
    let hello = Hello::new(bitmap.map(VersionBitmap::from_versions));
    let mut frame = OfMsg::generate(Version::V1_3, xid, OfPayload::Hello(hello))
        .unwrap()
        .to_bytes()
        .unwrap();
    frame[0] = header_version;
    frame
}

/// HELLO as a peer advertising `versions` would send it.
pub fn peer_hello(versions: &[Version]) -> Vec<u8> {
    let highest = versions.iter().max().unwrap();
    hello_frame(highest.wire(), 77, Some(versions))
}

pub fn frame(version: Version, xid: u32, payload: OfPayload) -> Vec<u8> {
    OfMsg::generate(version, xid, payload).unwrap().to_bytes().unwrap()
}

pub fn barrier_reply(version: Version, xid: u32) -> Vec<u8> {
    frame(version, xid, OfPayload::Raw(Type::BarrierReply, Vec::new()))
}
