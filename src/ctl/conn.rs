//! Control connection state machine.
//!
//! A [`Connection`] owns a [`Transport`] and reacts to three kinds of
//! input: transport notifications (`on_connected`, `on_closed`), frames
//! (`on_message`) and timer expiries (`on_timeout`). Input is turned into
//! [`Event`]s that are queued and drained by [`Connection::run_engine`]
//! one at a time, so events raised while handling an event run after it.

use num_traits::FromPrimitive;
use std::collections::{HashMap, VecDeque};
use std::convert::TryFrom;
use std::time::Duration;

use super::super::ds::error_msg::{ErrorMsg, HelloFailedCode};
use super::super::ds::hello::{Hello, VersionBitmap};
use super::super::ds::{Header, OfMsg, OfPayload, Pack, Type, Version};
use super::super::err::*;
use super::xid::{PendingOp, TransactionTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Disconnected,
    WaitForHello,
    Established,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Connected,
    Disconnected,
    HelloReceived,
    HelloExpired,
    EchoExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Peer HELLO must arrive before this fires.
    WaitForHello,
    /// Time to probe the peer with an echo request.
    SendEcho,
    /// Echo reply must arrive before this fires.
    WaitForEcho,
}

/// Opaque handle of a scheduled timer, issued by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// What a connection needs from the world: a way to ship frames and a
/// timer service. Expired timers are reported back through
/// [`Connection::on_timeout`].
pub trait Transport {
    fn send(&mut self, frame: Vec<u8>) -> Result<()>;
    fn close(&mut self);
    fn schedule_timer(&mut self, kind: TimerKind, after: Duration) -> TimerHandle;
    fn cancel_timer(&mut self, handle: TimerHandle);
}

/// Consumer of a connection. Only `on_message_received` is mandatory.
pub trait ConnectionHandler<T: Transport> {
    /// Any message other than HELLO, ECHO and ERROR, once established.
    fn on_message_received(&mut self, conn: &mut Connection<T>, msg: OfMsg);

    fn on_connection_established(&mut self, _conn: &mut Connection<T>, _version: Version) {}

    fn on_connection_closed(&mut self, _conn: &mut Connection<T>) {}

    /// Every ERROR from the peer, after its xid was completed.
    fn on_error_received(
        &mut self,
        _conn: &mut Connection<T>,
        _header: &Header,
        _error: &ErrorMsg,
    ) {
    }
}

#[derive(Getters, Debug, Clone)]
pub struct ConnectionConfig {
    #[get = "pub"]
    hello_timeout: Duration,
    #[get = "pub"]
    echo_interval: Duration,
    #[get = "pub"]
    echo_timeout: Duration,
    /// Versions we are willing to speak, intersected with the supported ones.
    #[get = "pub"]
    versions: VersionBitmap,
    #[get = "pub"]
    xid_capacity: usize,
    #[get = "pub"]
    auxiliary_id: u8,
}

impl ConnectionConfig {
    pub fn with_hello_timeout(mut self, timeout: Duration) -> Self {
        self.hello_timeout = timeout;
        self
    }

    pub fn with_echo_interval(mut self, interval: Duration) -> Self {
        self.echo_interval = interval;
        self
    }

    pub fn with_echo_timeout(mut self, timeout: Duration) -> Self {
        self.echo_timeout = timeout;
        self
    }

    pub fn with_versions(mut self, versions: VersionBitmap) -> Self {
        self.versions = versions;
        self
    }

    pub fn with_xid_capacity(mut self, capacity: usize) -> Self {
        self.xid_capacity = capacity;
        self
    }

    pub fn with_auxiliary_id(mut self, auxiliary_id: u8) -> Self {
        self.auxiliary_id = auxiliary_id;
        self
    }

    /// Configured versions this crate can actually speak.
    pub fn local_versions(&self) -> VersionBitmap {
        self.versions & VersionBitmap::supported()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            hello_timeout: Duration::from_secs(5),
            echo_interval: Duration::from_secs(15),
            echo_timeout: Duration::from_secs(5),
            versions: VersionBitmap::supported(),
            xid_capacity: 256,
            auxiliary_id: 0,
        }
    }
}

pub struct Connection<T: Transport> {
    transport: T,
    config: ConnectionConfig,
    state: State,
    negotiated: Option<Version>,
    /// Result of the last acceptable peer HELLO, applied on HelloReceived.
    pending_version: Option<Version>,
    peer_versions: Option<VersionBitmap>,
    hello_xid: Option<u32>,
    events: VecDeque<Event>,
    timers: HashMap<TimerKind, TimerHandle>,
    transactions: TransactionTable,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T, config: ConnectionConfig) -> Self {
        let transactions = TransactionTable::new(*config.xid_capacity());
        Connection {
            transport: transport,
            config: config,
            state: State::Disconnected,
            negotiated: None,
            pending_version: None,
            peer_versions: None,
            hello_xid: None,
            events: VecDeque::new(),
            timers: HashMap::new(),
            transactions: transactions,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_established(&self) -> bool {
        self.state == State::Established
    }

    /// Set exactly while established.
    pub fn negotiated_version(&self) -> Option<Version> {
        self.negotiated
    }

    pub fn peer_versions(&self) -> Option<VersionBitmap> {
        self.peer_versions
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn auxiliary_id(&self) -> u8 {
        *self.config.auxiliary_id()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn pending_transactions(&self) -> usize {
        self.transactions.len()
    }

    pub fn timer_armed(&self, kind: TimerKind) -> bool {
        self.timers.contains_key(&kind)
    }

    /// Transport reports an open channel.
    pub fn on_connected<H: ConnectionHandler<T>>(&mut self, handler: &mut H) {
        self.events.push_back(Event::Connected);
        self.run_engine(handler);
    }

    /// Transport reports the channel is gone.
    pub fn on_closed<H: ConnectionHandler<T>>(&mut self, handler: &mut H) {
        self.events.push_back(Event::Disconnected);
        self.run_engine(handler);
    }

    /// Queues a disconnect; it takes effect on the next `run_engine`.
    pub fn close(&mut self) {
        self.events.push_back(Event::Disconnected);
    }

    /// Feeds one complete frame. Errors describe what was wrong with the
    /// frame; the state machine has already reacted to them.
    pub fn on_message<H: ConnectionHandler<T>>(&mut self, handler: &mut H, frame: &[u8]) -> Result<()> {
        let result = Header::try_from(frame).and_then(|header| {
            trace!("Received {:?}.", header);
            match header.message_type() {
                Some(Type::Hello) => self.hello_received(&header, frame),
                Some(Type::EchoRequest) => self.echo_request_received(&header, frame),
                Some(Type::EchoReply) => {
                    self.echo_reply_received(&header);
                    Ok(())
                }
                Some(Type::Error) => self.error_received(handler, &header, frame),
                _ => self.message_received(handler, &header, frame),
            }
        });
        self.run_engine(handler);
        result
    }

    /// Dispatches a timer expiry. Handles that are no longer armed are
    /// ignored.
    pub fn on_timeout<H: ConnectionHandler<T>>(&mut self, handler: &mut H, handle: TimerHandle) {
        let kind = match self
            .timers
            .iter()
            .find(|(_, h)| **h == handle)
            .map(|(kind, _)| *kind)
        {
            Some(kind) => kind,
            None => {
                debug!("Ignoring stale timer {:?}.", handle);
                return;
            }
        };
        self.timers.remove(&kind);
        debug!("Timer {:?} expired in state {:?}.", kind, self.state);
        match kind {
            TimerKind::WaitForHello => self.events.push_back(Event::HelloExpired),
            TimerKind::WaitForEcho => self.events.push_back(Event::EchoExpired),
            TimerKind::SendEcho => {
                if self.state == State::Established {
                    self.send_echo_request();
                }
            }
        }
        self.run_engine(handler);
    }

    /// Drains the event queue.
    pub fn run_engine<H: ConnectionHandler<T>>(&mut self, handler: &mut H) {
        while let Some(event) = self.events.pop_front() {
            trace!("Handling {:?} in state {:?}.", event, self.state);
            match event {
                Event::Connected => self.handle_connected(),
                Event::Disconnected => self.handle_disconnected(handler),
                Event::HelloReceived => self.handle_hello_received(handler),
                Event::HelloExpired => {
                    if self.state == State::WaitForHello {
                        warn!(
                            "No HELLO from peer within {:?}, closing.",
                            self.config.hello_timeout()
                        );
                        self.events.push_back(Event::Disconnected);
                    } else {
                        error!("Ignoring {:?} in state {:?}.", event, self.state);
                    }
                }
                Event::EchoExpired => {
                    if self.state == State::Established {
                        warn!(
                            "No echo reply from peer within {:?}, closing.",
                            self.config.echo_timeout()
                        );
                        self.events.push_back(Event::Disconnected);
                    } else {
                        error!("Ignoring {:?} in state {:?}.", event, self.state);
                    }
                }
            }
        }
    }

    /// Sends a message that expects no reply. Returns the xid used.
    pub fn send_message(&mut self, payload: OfPayload) -> Result<u32> {
        let version = self.negotiated.ok_or::<Error>(ErrorKind::NotEstablished.into())?;
        let xid = self.transactions.fresh();
        let msg = OfMsg::generate(version, xid, payload)?;
        self.send_frame(&msg)?;
        Ok(xid)
    }

    /// Sends a request and tracks its xid until an answer with the same
    /// xid arrives.
    pub fn send_request(&mut self, payload: OfPayload) -> Result<u32> {
        let version = self.negotiated.ok_or::<Error>(ErrorKind::NotEstablished.into())?;
        let xid = self
            .transactions
            .allocate(PendingOp::Request(payload.message_type()))?;
        let sent = OfMsg::generate(version, xid, payload).and_then(|msg| self.send_frame(&msg));
        if let Err(e) = sent {
            self.transactions.complete(xid);
            return Err(e);
        }
        Ok(xid)
    }

    fn handle_connected(&mut self) {
        info!("Channel up, sending HELLO.");
        self.negotiated = None;
        self.send_hello();
        let timeout = *self.config.hello_timeout();
        self.reset_timer(TimerKind::WaitForHello, timeout);
        self.state = State::WaitForHello;
    }

    fn handle_disconnected<H: ConnectionHandler<T>>(&mut self, handler: &mut H) {
        if self.state == State::Disconnected {
            return;
        }
        info!("Closing connection in state {:?}.", self.state);
        self.cancel_timer(TimerKind::WaitForHello);
        self.cancel_timer(TimerKind::SendEcho);
        self.cancel_timer(TimerKind::WaitForEcho);
        self.transactions.clear();
        self.hello_xid = None;
        self.transport.close();
        self.negotiated = None;
        self.pending_version = None;
        self.peer_versions = None;
        self.state = State::Disconnected;
        handler.on_connection_closed(self);
    }

    fn handle_hello_received<H: ConnectionHandler<T>>(&mut self, handler: &mut H) {
        match self.state {
            State::Disconnected => {
                self.send_hello();
                let timeout = *self.config.hello_timeout();
                self.reset_timer(TimerKind::WaitForHello, timeout);
                self.state = State::WaitForHello;
            }
            State::WaitForHello | State::Established => {
                let version = match self.pending_version {
                    Some(version) => version,
                    None => {
                        error!("HELLO accepted without a negotiated version, closing.");
                        self.events.push_back(Event::Disconnected);
                        return;
                    }
                };
                self.cancel_timer(TimerKind::WaitForHello);
                let interval = *self.config.echo_interval();
                self.reset_timer(TimerKind::SendEcho, interval);
                if let Some(xid) = self.hello_xid.take() {
                    self.transactions.complete(xid);
                }
                let was_waiting = self.state == State::WaitForHello;
                self.negotiated = Some(version);
                self.state = State::Established;
                if was_waiting {
                    info!("Connection established with {:?}.", version);
                    handler.on_connection_established(self, version);
                }
            }
        }
    }

    fn send_hello(&mut self) {
        let version = match self
            .config
            .local_versions()
            .highest()
            .and_then(Version::from_u8)
        {
            Some(version) => version,
            None => {
                error!("No usable protocol version configured, closing.");
                self.events.push_back(Event::Disconnected);
                return;
            }
        };
        let xid = match self.transactions.allocate(PendingOp::Hello) {
            Ok(xid) => xid,
            Err(e) => {
                error!("Not sending HELLO: {}", e);
                return;
            }
        };
        if let Some(old) = self.hello_xid.replace(xid) {
            self.transactions.complete(old);
        }
        let hello = Hello::new(Some(self.config.local_versions()));
        let sent = OfMsg::generate(version, xid, OfPayload::Hello(hello))
            .and_then(|msg| self.send_frame(&msg));
        if let Err(e) = sent {
            warn!("Sending HELLO failed: {}", e);
        }
    }

    fn send_echo_request(&mut self) {
        let version = match self.negotiated {
            Some(version) => version,
            None => return,
        };
        let xid = match self.transactions.allocate(PendingOp::EchoRequest) {
            Ok(xid) => xid,
            Err(e) => {
                warn!("Postponing echo request: {}", e);
                let interval = *self.config.echo_interval();
                self.reset_timer(TimerKind::SendEcho, interval);
                return;
            }
        };
        let sent = OfMsg::generate(version, xid, OfPayload::EchoRequest(Vec::new()))
            .and_then(|msg| self.send_frame(&msg));
        match sent {
            Ok(()) => {
                let timeout = *self.config.echo_timeout();
                self.reset_timer(TimerKind::WaitForEcho, timeout);
            }
            Err(e) => {
                warn!("Sending echo request failed: {}", e);
                self.transactions.complete(xid);
            }
        }
    }

    fn hello_received(&mut self, header: &Header, frame: &[u8]) -> Result<()> {
        let header_version = *header.version();
        let peer = if header_version == Version::V1_0.wire() || header_version == Version::V1_2.wire() {
            // no hello elements in these versions, the body is ignored
            if let Err(e) = header.body(frame) {
                warn!("Malformed HELLO from peer, closing: {}", e);
                self.events.push_back(Event::Disconnected);
                return Err(e);
            }
            VersionBitmap::single(header_version)
        } else {
            let hello = match header.body(frame).and_then(Hello::try_from) {
                Ok(hello) => hello,
                Err(e) => {
                    warn!("Malformed HELLO from peer, closing: {}", e);
                    self.events.push_back(Event::Disconnected);
                    return Err(e);
                }
            };
            match hello.bitmap() {
                Some(bitmap) => {
                    if !bitmap.contains(header_version) {
                        warn!(
                            "Peer HELLO version {} is not part of its bitmap {}.",
                            header_version, bitmap
                        );
                    }
                    *bitmap
                }
                None => {
                    warn!(
                        "Peer HELLO version {} carries no version bitmap.",
                        header_version
                    );
                    VersionBitmap::single(header_version)
                }
            }
        };

        let common = self.config.local_versions() & peer;
        match common.highest().and_then(Version::from_u8) {
            Some(version) => {
                debug!("Peer offers {}, picking {:?}.", peer, version);
                self.peer_versions = Some(peer);
                self.pending_version = Some(version);
                self.events.push_back(Event::HelloReceived);
                Ok(())
            }
            None => {
                let denied = !(peer & VersionBitmap::supported()).is_empty();
                warn!(
                    "Peer offers {}, we allow {}: {}.",
                    peer,
                    self.config.local_versions(),
                    if denied { "not permitted" } else { "incompatible" }
                );
                let code = if denied {
                    HelloFailedCode::EPerm
                } else {
                    HelloFailedCode::Incompatible
                };
                self.send_hello_failed(header, frame, code);
                self.events.push_back(Event::Disconnected);
                if denied {
                    bail!(ErrorKind::PermissionDenied(header_version))
                } else {
                    bail!(ErrorKind::VersionIncompatible(header_version))
                }
            }
        }
    }

    /// HELLO_FAILED is answered in the peer's HELLO version, which is only
    /// possible for versions with a known error layout.
    fn send_hello_failed(&mut self, header: &Header, frame: &[u8], code: HelloFailedCode) {
        let version = match Version::from_u8(*header.version()) {
            Some(v @ Version::V1_0) | Some(v @ Version::V1_2) | Some(v @ Version::V1_3) => v,
            _ => {
                debug!("No HELLO_FAILED for wire version {}.", header.version());
                return;
            }
        };
        let data = header.body(frame).map(|_| &frame[..*header.length() as usize]);
        let error = ErrorMsg::hello_failed(code, data.unwrap_or(frame).to_vec());
        let sent = OfMsg::generate(version, *header.xid(), OfPayload::Error(error))
            .and_then(|msg| self.send_frame(&msg));
        if let Err(e) = sent {
            warn!("Sending HELLO_FAILED failed: {}", e);
        }
    }

    fn echo_request_received(&mut self, header: &Header, frame: &[u8]) -> Result<()> {
        let body = header.body(frame)?;
        let reply = OfMsg::new(
            Header::new(
                *header.version(),
                Type::EchoReply as u8,
                *header.length(),
                *header.xid(),
            ),
            OfPayload::EchoReply(body.to_vec()),
        );
        self.send_frame(&reply)
    }

    fn echo_reply_received(&mut self, header: &Header) {
        let xid = *header.xid();
        match self.transactions.get(xid) {
            Some(PendingOp::EchoRequest) => {
                self.transactions.complete(xid);
                if self.state == State::Established {
                    self.cancel_timer(TimerKind::WaitForEcho);
                    let interval = *self.config.echo_interval();
                    self.reset_timer(TimerKind::SendEcho, interval);
                }
            }
            _ => debug!("Ignoring echo reply with unknown xid {}.", xid),
        }
    }

    fn error_received<H: ConnectionHandler<T>>(
        &mut self,
        handler: &mut H,
        header: &Header,
        frame: &[u8],
    ) -> Result<()> {
        let error = match OfMsg::try_from(frame)?.into_payload() {
            OfPayload::Error(error) => error,
            other => {
                bail!(ErrorKind::IllegalValue(
                    other.message_type() as u64,
                    stringify!(ErrorMsg)
                ))
            }
        };
        warn!(
            "Peer sent error type {} code {} for xid {}.",
            error.ttype(),
            error.code(),
            header.xid()
        );
        self.transactions.complete(*header.xid());
        handler.on_error_received(self, header, &error);
        if error.is_hello_failed() && self.state == State::WaitForHello {
            warn!("Peer rejected our HELLO, closing.");
            self.events.push_back(Event::Disconnected);
        }
        Ok(())
    }

    fn message_received<H: ConnectionHandler<T>>(
        &mut self,
        handler: &mut H,
        header: &Header,
        frame: &[u8],
    ) -> Result<()> {
        if self.state != State::Established {
            warn!(
                "Dropping message type {} received in state {:?}.",
                header.ttype(),
                self.state
            );
            return Ok(());
        }
        if header.ofp_version() != self.negotiated {
            debug!(
                "Message version {} differs from negotiated {:?}.",
                header.version(),
                self.negotiated
            );
        }
        let msg = OfMsg::try_from(frame)?;
        let more_to_come = match msg.payload() {
            OfPayload::MultipartReply(reply) => reply.has_more(),
            _ => false,
        };
        if !more_to_come {
            self.transactions.complete(*header.xid());
        }
        handler.on_message_received(self, msg);
        Ok(())
    }

    /// Encodes and hands a frame to the transport. A failing transport
    /// takes the connection down.
    fn send_frame(&mut self, msg: &OfMsg) -> Result<()> {
        let bytes = msg.to_bytes()?;
        trace!("Sending {:?}.", msg.header());
        if let Err(e) = self.transport.send(bytes) {
            error!("Transport refused frame: {}", e);
            self.events.push_back(Event::Disconnected);
            return Err(e);
        }
        Ok(())
    }

    fn reset_timer(&mut self, kind: TimerKind, after: Duration) {
        self.cancel_timer(kind);
        let handle = self.transport.schedule_timer(kind, after);
        self.timers.insert(kind, handle);
    }

    fn cancel_timer(&mut self, kind: TimerKind) {
        if let Some(handle) = self.timers.remove(&kind) {
            self.transport.cancel_timer(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Wire {
        sent: Vec<Vec<u8>>,
        closed: bool,
        next_timer: u64,
        armed: Vec<(TimerHandle, TimerKind)>,
    }

    impl Transport for Wire {
        fn send(&mut self, frame: Vec<u8>) -> Result<()> {
            self.sent.push(frame);
            Ok(())
        }

        fn close(&mut self) {
            self.closed = true;
        }

        fn schedule_timer(&mut self, kind: TimerKind, _after: Duration) -> TimerHandle {
            self.next_timer += 1;
            let handle = TimerHandle(self.next_timer);
            self.armed.push((handle, kind));
            handle
        }

        fn cancel_timer(&mut self, handle: TimerHandle) {
            self.armed.retain(|(h, _)| *h != handle);
        }
    }

    impl Wire {
        fn armed(&self, kind: TimerKind) -> Option<TimerHandle> {
            self.armed.iter().find(|(_, k)| *k == kind).map(|(h, _)| *h)
        }
    }

    #[derive(Default)]
    struct Recorder {
        established: Vec<Version>,
        closed: usize,
        messages: Vec<OfMsg>,
    }

    impl ConnectionHandler<Wire> for Recorder {
        fn on_message_received(&mut self, _conn: &mut Connection<Wire>, msg: OfMsg) {
            self.messages.push(msg);
        }

        fn on_connection_established(&mut self, _conn: &mut Connection<Wire>, version: Version) {
            self.established.push(version);
        }

        fn on_connection_closed(&mut self, _conn: &mut Connection<Wire>) {
            self.closed += 1;
        }
    }

    fn hello(version: u8, bitmap: Option<VersionBitmap>) -> Vec<u8> {
        let mut msg = OfMsg::generate(Version::V1_3, 99, OfPayload::Hello(Hello::new(bitmap)))
            .unwrap()
            .to_bytes()
            .unwrap();
        msg[0] = version;
        msg
    }

    fn testee() -> (Connection<Wire>, Recorder) {
        let _ = simple_logger::init();
        let mut conn = Connection::new(Wire::default(), ConnectionConfig::default());
        let mut handler = Recorder::default();
        conn.on_connected(&mut handler);
        (conn, handler)
    }

    #[test]
    fn sends_hello_on_connect() {
        let (conn, _) = testee();
        assert_eq!(State::WaitForHello, conn.state());
        let frame = &conn.transport().sent[0];
        assert_eq!(4, frame[0]);
        assert_eq!(0, frame[1]);
        let hello = Hello::try_from(&frame[8..]).unwrap();
        assert_eq!(Some(&VersionBitmap::supported()), hello.bitmap());
        assert!(conn.timer_armed(TimerKind::WaitForHello));
        assert_eq!(1, conn.pending_transactions());
    }

    #[test]
    fn establishes_highest_common() {
        let (mut conn, mut handler) = testee();
        let peer = VersionBitmap::from_versions(&[Version::V1_0, Version::V1_2]);
        conn.on_message(&mut handler, &hello(4, Some(peer))).unwrap();
        assert_eq!(State::Established, conn.state());
        assert_eq!(Some(Version::V1_2), conn.negotiated_version());
        assert_eq!(vec![Version::V1_2], handler.established);
        assert!(!conn.timer_armed(TimerKind::WaitForHello));
        assert!(conn.timer_armed(TimerKind::SendEcho));
        assert_eq!(0, conn.pending_transactions());
    }

    #[test]
    fn stale_timer_ignored() {
        let (mut conn, mut handler) = testee();
        conn.on_message(&mut handler, &hello(4, None)).unwrap();
        conn.on_timeout(&mut handler, TimerHandle(1000));
        assert_eq!(State::Established, conn.state());
    }

    #[test]
    fn messages_need_established() {
        let mut conn = Connection::new(Wire::default(), ConnectionConfig::default());
        let err = conn
            .send_message(OfPayload::Raw(Type::BarrierRequest, Vec::new()))
            .unwrap_err();
        assert!(match err.kind() {
            ErrorKind::NotEstablished => true,
            _ => false,
        });
    }

    #[test]
    fn send_echo_without_free_xid_reschedules() {
        let _ = simple_logger::init();
        let config = ConnectionConfig::default().with_xid_capacity(1);
        let mut conn = Connection::new(Wire::default(), config);
        let mut handler = Recorder::default();
        conn.on_connected(&mut handler);
        conn.on_message(&mut handler, &hello(4, None)).unwrap();
        conn.send_request(OfPayload::Raw(Type::BarrierRequest, Vec::new()))
            .unwrap();
        let handle = conn.transport().armed(TimerKind::SendEcho).unwrap();
        let frames = conn.transport().sent.len();
        conn.on_timeout(&mut handler, handle);
        assert_eq!(frames, conn.transport().sent.len());
        assert!(conn.timer_armed(TimerKind::SendEcho));
        assert!(!conn.timer_armed(TimerKind::WaitForEcho));
    }

    #[test]
    fn close_tears_down() {
        let (mut conn, mut handler) = testee();
        conn.on_message(&mut handler, &hello(4, None)).unwrap();
        conn.close();
        conn.run_engine(&mut handler);
        assert_eq!(State::Disconnected, conn.state());
        assert_eq!(None, conn.negotiated_version());
        assert!(conn.transport().closed);
        assert!(conn.transport().armed.is_empty());
        assert_eq!(1, handler.closed);
        // idempotent
        conn.on_closed(&mut handler);
        assert_eq!(1, handler.closed);
    }
}
