use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::IpcStream;

/// Scratch size for the availability probe. Reports are capped at this.
const PEEK_PROBE_SIZE: usize = 4096;

/// Connect to a loopback TCP listener, giving up after `timeout`.
pub fn connect(addr: SocketAddr, timeout: Duration) -> Result<IpcStream> {
    let stream =
        TcpStream::connect_timeout(&addr, timeout).map_err(|source| TransportError::Connect {
            endpoint: format!("tcp:{addr}"),
            source,
        })?;
    stream.set_nodelay(true)?;
    debug!(%addr, "connected to tcp loopback");
    Ok(IpcStream::from_tcp(stream))
}

/// Bind a TCP listener for the counterpart side.
pub fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).map_err(|source| TransportError::Bind {
        endpoint: format!("tcp:{addr}"),
        source,
    })?;
    info!(%addr, "listening on tcp loopback");
    Ok(listener)
}

/// Bytes readable without blocking, or an error once the peer has hung up.
///
/// The stream stays blocking for reads and writes; only the probe is
/// switched to non-blocking mode.
pub(crate) fn bytes_available(stream: &TcpStream) -> Result<usize> {
    let mut probe = [0u8; PEEK_PROBE_SIZE];
    stream.set_nonblocking(true)?;
    let peeked = stream.peek(&mut probe);
    stream.set_nonblocking(false)?;

    match peeked {
        Ok(0) => Err(TransportError::Closed),
        Ok(n) => Ok(n),
        Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => Ok(0),
        Err(err) => Err(err.into()),
    }
}
