use std::net::{TcpListener, ToSocketAddrs};
use std::thread;

use super::err::*;

pub mod conn;
pub mod switch;
pub mod xid;

pub use self::conn::{Connection, ConnectionConfig, ConnectionHandler, Event, State, TimerHandle, TimerKind, Transport};
pub use self::switch::TcpTransport;

/// Accepts switches on `listener`, one thread per control channel.
/// `factory` builds the handler of each new channel.
pub fn serve<F, H>(listener: TcpListener, config: ConnectionConfig, factory: F) -> Result<()>
where
    F: Fn() -> H,
    H: ConnectionHandler<TcpTransport> + Send + 'static,
{
    info!("Starting tcp accept on {:?}.", listener.local_addr());
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Accepting tcp connection failed: {}", e);
                continue;
            }
        };
        let peer = stream.peer_addr();
        info!("Tcp connection from: {:?}.", peer);
        let mut handler = factory();
        let config = config.clone();
        thread::Builder::new()
            .name(format!("Switch {:?}", peer))
            .spawn(move || {
                if let Err(e) = switch::run_switch_connection(stream, config, &mut handler) {
                    warn!("Control channel ended with error: {}", e);
                }
            })?;
    }
    Ok(())
}

/// Binds `addr` and serves switches on it. Only returns on errors.
pub fn start_controller<A, F, H>(addr: A, config: ConnectionConfig, factory: F) -> Result<()>
where
    A: ToSocketAddrs,
    F: Fn() -> H,
    H: ConnectionHandler<TcpTransport> + Send + 'static,
{
    info!("Starting tcp listener.");
    let tcp_listener = TcpListener::bind(addr)?;
    info!(
        "Tcp listener successfully started at {:?}.",
        tcp_listener.local_addr()
    );
    serve(tcp_listener, config, factory)
}
