//! Tick-driven status/command channel between a host application and an
//! external counterpart process.
//!
//! The host publishes JSON status lines and reads back plain-text commands
//! over one local connection, without ever blocking its main loop on the
//! counterpart.
//!
//! # Crate Structure
//!
//! - [`transport`]: Endpoints, connectors and connections (Unix sockets, TCP loopback, named pipes)
//! - [`frame`]: Newline framing and the residual line buffer
//! - [`channel`]: The channel manager, its configuration and status payloads

/// Re-export transport types.
pub mod transport {
    pub use tickpipe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use tickpipe_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use tickpipe_channel::*;
}
