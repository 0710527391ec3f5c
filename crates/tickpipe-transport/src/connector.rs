use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::traits::{Connector, IpcStream};

/// Default bound on a TCP loopback connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(250);

/// Opens an [`Endpoint`] with whatever primitive the platform offers.
///
/// Endpoint kinds the platform lacks fail with
/// [`TransportError::Unsupported`] at open time, so callers never need
/// their own platform checks.
#[derive(Debug, Clone)]
pub struct EndpointConnector {
    endpoint: Endpoint,
    connect_timeout: Duration,
}

impl EndpointConnector {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Override the TCP connect timeout. Other transports never wait.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Whether this platform can open the configured endpoint at all.
    pub fn is_supported(&self) -> bool {
        match self.endpoint {
            Endpoint::NamedPipe(_) => cfg!(windows),
            Endpoint::Unix(_) => cfg!(unix),
            Endpoint::Tcp(_) => true,
        }
    }

    fn unsupported(&self) -> TransportError {
        TransportError::Unsupported {
            endpoint: self.endpoint.to_string(),
            platform: std::env::consts::OS,
        }
    }
}

impl Connector for EndpointConnector {
    type Connection = IpcStream;

    fn open(&self) -> Result<IpcStream> {
        match &self.endpoint {
            #[cfg(windows)]
            Endpoint::NamedPipe(name) => crate::pipe::connect(name),
            #[cfg(not(windows))]
            Endpoint::NamedPipe(_) => Err(self.unsupported()),

            #[cfg(unix)]
            Endpoint::Unix(path) => crate::uds::UnixDomainSocket::connect(path),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(self.unsupported()),

            Endpoint::Tcp(addr) => crate::tcp::connect(*addr, self.connect_timeout),
        }
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn named_pipe_is_unsupported_on_unix() {
        let connector = EndpointConnector::new(Endpoint::NamedPipe("Game".to_string()));
        assert!(!connector.is_supported());

        let err = connector.open().unwrap_err();
        assert!(matches!(err, TransportError::Unsupported { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    #[cfg(unix)]
    fn missing_unix_socket_is_transient() {
        let path = std::env::temp_dir().join(format!(
            "tickpipe-connector-missing-{}.sock",
            std::process::id()
        ));
        let connector = EndpointConnector::new(Endpoint::Unix(path));
        assert!(connector.is_supported());

        let err = connector.open().unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err}");
    }

    #[test]
    fn connector_reports_endpoint() {
        let endpoint: Endpoint = "tcp:127.0.0.1:7000".parse().unwrap();
        let connector = EndpointConnector::new(endpoint.clone())
            .with_connect_timeout(Duration::from_millis(50));
        assert_eq!(connector.endpoint(), &endpoint);
        assert!(connector.is_supported());
    }
}
