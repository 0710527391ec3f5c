//! Resilient line channel between a host main loop and an external counterpart.
//!
//! A [`ChannelManager`] owns at most one connection to a counterpart's
//! channel. The host calls [`ChannelManager::poll`] once per cycle to read
//! commands and [`ChannelManager::send_line`] (or the status helpers) to
//! publish state. The counterpart may be absent, slow or restart at any
//! time: failed connects are counted and retried on the next call, broken
//! connections are dropped and reopened, and no operation returns an error.
//!
//! # Example
//!
//! ```no_run
//! use tickpipe_channel::{ChannelManager, PollOutcome};
//! use tickpipe_transport::{Endpoint, EndpointConnector};
//!
//! let mut channel = ChannelManager::new(EndpointConnector::new(Endpoint::default()));
//! channel.initialize();
//!
//! let mut handle = |command: &str| println!("command: {command}");
//! for turn in 0..3 {
//!     channel.send_turn_start(turn, 0, &serde_json::json!({ "playersAlive": 2 }));
//!     if let PollOutcome::Dispatched(n) = channel.poll(&mut handle) {
//!         println!("{n} command(s) this tick");
//!     }
//! }
//! channel.shutdown(Some("game exit"));
//! ```

pub mod config;
pub mod diagnostics;
pub mod manager;
pub mod sink;
pub mod status;

pub use config::{
    ChannelConfig, PollPolicy, DEFAULT_READ_CHUNK_SIZE, DEFAULT_UNAVAILABLE_LOG_INTERVAL,
    DEFAULT_WRITE_TIMEOUT,
};
pub use diagnostics::{DiagnosticRecord, Diagnostics, MemoryDiagnostics, TracingDiagnostics};
pub use manager::{ChannelManager, ConnectionState, PollOutcome, DEFAULT_SHUTDOWN_CONTEXT};
pub use sink::CommandSink;
pub use status::StatusMessage;
