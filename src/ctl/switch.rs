//! Blocking TCP driver for a [`Connection`]: frames the byte stream,
//! keeps the timers and polls the socket with read timeouts.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::io::{ErrorKind as IoErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::{Duration, Instant};

use super::super::ds::{Header, HEADER_LENGTH};
use super::super::err::*;
use super::conn::{Connection, ConnectionConfig, ConnectionHandler, State, TimerHandle, TimerKind, Transport};

pub const READ_BUFFER_SIZE: usize = 4096;
/// Socket poll interval while no timer is armed.
const IDLE_POLL: Duration = Duration::from_millis(500);

/// Splits a byte stream into OpenFlow frames using the header length.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        FrameBuffer { buf: Vec::new() }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes received but not yet part of a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Takes the next complete frame off the buffer, if there is one.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        if self.buf.len() < HEADER_LENGTH {
            return Ok(None);
        }
        let header = Header::try_from(&self.buf[..HEADER_LENGTH])?;
        let length = *header.length() as usize;
        if length < HEADER_LENGTH {
            bail!(ErrorKind::BadLength(length, stringify!(Header)));
        }
        if self.buf.len() < length {
            return Ok(None);
        }
        Ok(Some(self.buf.drain(..length).collect()))
    }
}

/// [`Transport`] over a `TcpStream`. Timers are deadlines checked by
/// [`run_switch_connection`] between reads.
pub struct TcpTransport {
    stream: TcpStream,
    next_timer: u64,
    timers: HashMap<TimerHandle, Instant>,
    closed: bool,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        Ok(TcpTransport {
            stream: stream,
            next_timer: 0,
            timers: HashMap::new(),
            closed: false,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Earliest armed deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().min().cloned()
    }

    /// Disarms and returns every timer due at `now`, earliest first.
    pub fn take_expired(&mut self, now: Instant) -> Vec<TimerHandle> {
        let mut due: Vec<(TimerHandle, Instant)> = self
            .timers
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(handle, deadline)| (*handle, *deadline))
            .collect();
        due.sort_by_key(|(_, deadline)| *deadline);
        for (handle, _) in &due {
            self.timers.remove(handle);
        }
        due.into_iter().map(|(handle, _)| handle).collect()
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> ::std::io::Result<usize> {
        self.stream.set_read_timeout(Some(timeout))?;
        self.stream.read(buf)
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, frame: Vec<u8>) -> Result<()> {
        if self.closed {
            bail!(ErrorKind::NotEstablished);
        }
        self.stream.write_all(&frame[..])?;
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            info!("Closing tcp stream to {:?}.", self.stream.peer_addr());
            if let Err(e) = self.stream.shutdown(Shutdown::Both) {
                debug!("Shutdown of tcp stream failed: {}", e);
            }
            self.closed = true;
        }
        self.timers.clear();
    }

    fn schedule_timer(&mut self, kind: TimerKind, after: Duration) -> TimerHandle {
        self.next_timer += 1;
        let handle = TimerHandle(self.next_timer);
        trace!("Arming {:?} ({:?}) in {:?}.", kind, handle, after);
        self.timers.insert(handle, Instant::now() + after);
        handle
    }

    fn cancel_timer(&mut self, handle: TimerHandle) {
        self.timers.remove(&handle);
    }
}

/// Runs the control channel on an accepted or connected stream until
/// the connection is closed.
pub fn run_switch_connection<H>(stream: TcpStream, config: ConnectionConfig, handler: &mut H) -> Result<()>
where
    H: ConnectionHandler<TcpTransport>,
{
    info!("Starting control channel with {:?}.", stream.peer_addr());
    let mut conn = Connection::new(TcpTransport::new(stream)?, config);
    let mut frames = FrameBuffer::new();
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    conn.on_connected(handler);

    while conn.state() != State::Disconnected {
        let now = Instant::now();
        for handle in conn.transport_mut().take_expired(now) {
            conn.on_timeout(handler, handle);
        }
        if conn.state() == State::Disconnected {
            break;
        }

        let timeout = match conn.transport().next_deadline() {
            Some(deadline) if deadline > now => deadline - now,
            Some(_) => Duration::from_millis(1),
            None => IDLE_POLL,
        };
        match conn.transport_mut().read(&mut buffer, timeout.max(Duration::from_millis(1))) {
            Ok(0) => {
                info!("Peer closed the control channel.");
                conn.on_closed(handler);
            }
            Ok(n) => {
                frames.extend(&buffer[..n]);
                loop {
                    let frame = match frames.next_frame() {
                        Ok(Some(frame)) => frame,
                        Ok(None) => break,
                        Err(e) => {
                            error!("Cannot frame peer byte stream: {}", e);
                            conn.on_closed(handler);
                            return Err(e);
                        }
                    };
                    if let Err(e) = conn.on_message(handler, &frame[..]) {
                        warn!("Handling frame failed: {}", e);
                    }
                }
            }
            Err(ref e) if e.kind() == IoErrorKind::WouldBlock || e.kind() == IoErrorKind::TimedOut => {}
            Err(e) => {
                error!("Reading control channel failed: {}", e);
                conn.on_closed(handler);
                return Err(e.into());
            }
        }
    }
    info!("Control channel finished.");
    Ok(())
}

/// Opens an active connection to `addr` and runs it.
pub fn connect<A, H>(addr: A, config: ConnectionConfig, handler: &mut H) -> Result<()>
where
    A: ::std::net::ToSocketAddrs,
    H: ConnectionHandler<TcpTransport>,
{
    let stream = TcpStream::connect(addr)?;
    run_switch_connection(stream, config, handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_split_across_reads() {
        let mut testee = FrameBuffer::new();
        testee.extend(&[4, 2, 0, 10, 0, 0]);
        assert_eq!(None, testee.next_frame().unwrap());
        testee.extend(&[0, 1, 7, 8, 4, 3, 0, 8]);
        assert_eq!(
            Some(vec![4, 2, 0, 10, 0, 0, 0, 1, 7, 8]),
            testee.next_frame().unwrap()
        );
        assert_eq!(None, testee.next_frame().unwrap());
        assert_eq!(4, testee.buffered());
        testee.extend(&[0, 0, 0, 1]);
        assert_eq!(Some(vec![4, 3, 0, 8, 0, 0, 0, 1]), testee.next_frame().unwrap());
        assert_eq!(0, testee.buffered());
    }

    #[test]
    fn frame_length_below_header() {
        let mut testee = FrameBuffer::new();
        testee.extend(&[4, 0, 0, 4, 0, 0, 0, 1]);
        assert!(testee.next_frame().is_err());
    }
}
