//! Capability-checked local transports for tickpipe.
//!
//! A host opens the counterpart's existing channel through a [`Connector`]
//! and talks to it through the small [`Connection`] surface:
//! - Named pipes (Windows)
//! - Unix domain sockets (Linux/macOS)
//! - TCP loopback (everywhere)
//!
//! This is the lowest layer of tickpipe. Everything else builds on the
//! traits defined here.

pub mod connector;
pub mod endpoint;
pub mod error;
pub mod listener;
pub mod tcp;
pub mod traits;

#[cfg(unix)]
pub mod uds;

#[cfg(windows)]
pub mod pipe;

pub use connector::{EndpointConnector, DEFAULT_CONNECT_TIMEOUT};
pub use endpoint::{Endpoint, ParseEndpointError, DEFAULT_CHANNEL_NAME, DEFAULT_UNIX_PATH};
pub use error::{Result, TransportError};
pub use listener::Listener;
pub use traits::{Connection, Connector, IpcStream};

#[cfg(unix)]
pub use uds::UnixDomainSocket;
