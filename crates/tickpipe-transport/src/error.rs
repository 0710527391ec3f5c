use std::io::ErrorKind;
use std::path::PathBuf;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the counterpart's endpoint.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to bind a listening endpoint.
    #[error("failed to bind to {endpoint}: {source}")]
    Bind {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on an established connection.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The endpoint kind is not available on this platform.
    #[error("{endpoint} is not supported on {platform}")]
    Unsupported {
        endpoint: String,
        platform: &'static str,
    },

    /// The counterpart closed its end of the connection.
    #[error("connection closed by peer")]
    Closed,
}

/// Windows `ERROR_PIPE_BUSY`: every server instance of the pipe is in use.
#[cfg(windows)]
const ERROR_PIPE_BUSY: i32 = 231;

impl TransportError {
    /// Whether this is an expected "counterpart not there yet" failure.
    ///
    /// Transient failures are retried on the next cycle without alarm.
    /// Everything else is unexpected and worth reporting every time.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Connect { source, .. } => is_transient_io(source),
            _ => false,
        }
    }
}

fn is_transient_io(err: &std::io::Error) -> bool {
    #[cfg(windows)]
    if err.raw_os_error() == Some(ERROR_PIPE_BUSY) {
        return true;
    }

    matches!(
        err.kind(),
        ErrorKind::NotFound
            | ErrorKind::ConnectionRefused
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
            | ErrorKind::ResourceBusy
    )
}

pub type Result<T> = std::result::Result<T, TransportError>;
