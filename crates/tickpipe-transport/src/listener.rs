use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::traits::IpcStream;

/// Counterpart-side listener.
///
/// Hosts never listen; this exists for tools and tests that play the
/// external process. Named-pipe servers are not provided.
pub enum Listener {
    #[cfg(unix)]
    Unix(crate::uds::UnixDomainSocket),
    Tcp(std::net::TcpListener),
}

impl Listener {
    /// Bind a listener on `endpoint`.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        match endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => Ok(Listener::Unix(crate::uds::UnixDomainSocket::bind(path)?)),
            Endpoint::Tcp(addr) => Ok(Listener::Tcp(crate::tcp::bind(*addr)?)),
            other => Err(TransportError::Unsupported {
                endpoint: format!("listening on {other}"),
                platform: std::env::consts::OS,
            }),
        }
    }

    /// Accept the next connection (blocking).
    pub fn accept(&self) -> Result<IpcStream> {
        match self {
            #[cfg(unix)]
            Listener::Unix(socket) => socket.accept(),
            Listener::Tcp(listener) => {
                let (stream, peer) = listener.accept().map_err(TransportError::Accept)?;
                tracing::debug!(%peer, "accepted tcp connection");
                Ok(IpcStream::from_tcp(stream))
            }
        }
    }

    /// The endpoint actually bound (resolves port 0 for TCP).
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        match self {
            #[cfg(unix)]
            Listener::Unix(socket) => Ok(Endpoint::Unix(socket.path().to_path_buf())),
            Listener::Tcp(listener) => Ok(Endpoint::Tcp(listener.local_addr()?)),
        }
    }
}
