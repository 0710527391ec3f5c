use std::io::{Read, Write};
use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::error::Result;

/// The operations a line channel needs from an open connection.
///
/// Closing is dropping. Every method must return promptly: the channel
/// manager calls these from the host's main loop.
pub trait Connection {
    /// Number of bytes that can be read right now without blocking.
    ///
    /// Returns an error when the connection is broken or the peer has
    /// closed it, so callers can tear down instead of spinning on zero.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read up to `buf.len()` bytes in a single call.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write `buf` with a single call and report how many bytes were taken.
    ///
    /// A short count is returned as-is, not retried.
    fn write_chunk(&mut self, buf: &[u8]) -> Result<usize>;

    /// Bound how long a single write may block.
    fn set_write_timeout(&mut self, _timeout: Option<Duration>) -> Result<()> {
        Ok(())
    }

    /// Opaque identity of the underlying handle, for diagnostics.
    fn handle_id(&self) -> String {
        "-".to_string()
    }
}

/// Opens connections to a counterpart's existing channel.
///
/// Implementations never create the channel themselves.
pub trait Connector {
    type Connection: Connection;

    /// Attempt a single, non-waiting open of the channel.
    fn open(&self) -> Result<Self::Connection>;

    /// The endpoint this connector opens, for diagnostics.
    fn endpoint(&self) -> &Endpoint;
}

/// A connected local IPC stream.
///
/// Wraps whichever OS primitive the endpoint resolved to. Implements
/// [`Connection`] for the channel manager and `Read + Write` for
/// counterpart-side code.
pub struct IpcStream {
    inner: IpcStreamInner,
}

enum IpcStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(std::net::TcpStream),
    #[cfg(windows)]
    Pipe(std::fs::File),
}

impl IpcStream {
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: IpcStreamInner::Unix(stream),
        }
    }

    pub(crate) fn from_tcp(stream: std::net::TcpStream) -> Self {
        Self {
            inner: IpcStreamInner::Tcp(stream),
        }
    }

    #[cfg(windows)]
    pub(crate) fn from_pipe(file: std::fs::File) -> Self {
        Self {
            inner: IpcStreamInner::Pipe(file),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            IpcStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            // Synchronous pipe handles have no per-call timeout.
            #[cfg(windows)]
            IpcStreamInner::Pipe(_) => Ok(()),
        }
    }

    /// Try to clone this stream (creates a new OS handle).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
            IpcStreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => Ok(Self::from_pipe(file.try_clone()?)),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(_) => "unix-domain-socket",
            IpcStreamInner::Tcp(_) => "tcp-loopback",
            #[cfg(windows)]
            IpcStreamInner::Pipe(_) => "named-pipe",
        }
    }
}

impl Connection for IpcStream {
    fn bytes_available(&mut self) -> Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => crate::uds::bytes_available(stream),
            IpcStreamInner::Tcp(stream) => crate::tcp::bytes_available(stream),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => crate::pipe::bytes_available(file),
        }
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.read(buf).map_err(Into::into),
            IpcStreamInner::Tcp(stream) => stream.read(buf).map_err(Into::into),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => crate::pipe::read_chunk(file, buf),
        }
    }

    fn write_chunk(&mut self, buf: &[u8]) -> Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.write(buf).map_err(Into::into),
            IpcStreamInner::Tcp(stream) => stream.write(buf).map_err(Into::into),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => file.write(buf).map_err(Into::into),
        }
    }

    fn set_write_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            IpcStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(windows)]
            IpcStreamInner::Pipe(_) => {
                let _ = timeout;
                Ok(())
            }
        }
    }

    fn handle_id(&self) -> String {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => {
                use std::os::fd::AsRawFd;
                format!("fd:{}", stream.as_raw_fd())
            }
            IpcStreamInner::Tcp(stream) => match stream.local_addr() {
                Ok(addr) => format!("tcp:{addr}"),
                Err(_) => "tcp:?".to_string(),
            },
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => {
                use std::os::windows::io::AsRawHandle;
                format!("handle:{:p}", file.as_raw_handle())
            }
        }
    }
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.read(buf),
            IpcStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => file.read(buf),
        }
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.write(buf),
            IpcStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.flush(),
            IpcStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => file.flush(),
        }
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcStream")
            .field("type", &self.transport_name())
            .field("handle", &self.handle_id())
            .finish()
    }
}
