use std::fmt;

use bytes::BytesMut;
use serde::Serialize;
use tickpipe_frame::{encode_line, json_escape, LineBuffer};
use tickpipe_transport::{Connection, Connector};
use tracing::Level;

use crate::config::{ChannelConfig, PollPolicy};
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::sink::CommandSink;
use crate::status::StatusMessage;

/// Context used by `shutdown` when the caller gives none.
pub const DEFAULT_SHUTDOWN_CONTEXT: &str = "unspecified";

/// Upper bound on reads performed by one drain-all poll.
const MAX_DRAIN_READS: usize = 64;

/// Whether the manager currently holds an open connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connected => f.write_str("connected"),
        }
    }
}

/// Result of one `poll` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No connection; the counterpart is absent or the connection just broke.
    Disconnected,
    /// Connected, nothing new to read.
    Idle,
    /// Bytes arrived but no complete command yet.
    Pending,
    /// This many commands were handed to the sink.
    Dispatched(usize),
}

impl PollOutcome {
    pub fn dispatched(&self) -> usize {
        match self {
            Self::Dispatched(n) => *n,
            _ => 0,
        }
    }
}

enum ReadStep {
    Empty,
    Read,
    Failed,
}

/// Owns the single connection to the counterpart and the line protocol on it.
///
/// Every operation is non-blocking from the host's point of view: connect
/// failures are absorbed and counted, mid-session I/O failures tear the
/// connection down, and the next call reconnects. Nothing returns an error.
pub struct ChannelManager<C: Connector, D: Diagnostics = TracingDiagnostics> {
    connector: C,
    connection: Option<C::Connection>,
    failed_connect_attempts: u32,
    pending: LineBuffer,
    write_buf: BytesMut,
    read_buf: Vec<u8>,
    config: ChannelConfig,
    diagnostics: D,
}

impl<C: Connector> ChannelManager<C> {
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, ChannelConfig::default())
    }

    pub fn with_config(connector: C, config: ChannelConfig) -> Self {
        Self::with_diagnostics(connector, config, TracingDiagnostics)
    }
}

impl<C: Connector, D: Diagnostics> ChannelManager<C, D> {
    /// Create a disconnected manager reporting to `diagnostics`.
    ///
    /// No connection is attempted until the first operation that needs one.
    pub fn with_diagnostics(connector: C, config: ChannelConfig, diagnostics: D) -> Self {
        let read_buf = vec![0; config.effective_chunk_size()];
        Self {
            connector,
            connection: None,
            failed_connect_attempts: 0,
            pending: LineBuffer::new(),
            write_buf: BytesMut::new(),
            read_buf,
            config,
            diagnostics,
        }
    }

    /// Reset the attempt counter and try to connect once.
    ///
    /// Safe to call repeatedly. A missing counterpart is not an error.
    pub fn initialize(&mut self) {
        self.record(
            Level::INFO,
            "initialize requested",
            &[
                ("handle", self.handle_label()),
                ("failed_connect_attempts", self.failed_connect_attempts.to_string()),
            ],
        );
        self.failed_connect_attempts = 0;
        self.ensure_connected();
        self.log_state("initialize (post)", self.is_connected());
        self.record(Level::INFO, "initialized", &[]);
    }

    /// Make sure a connection is held, attempting one open if not.
    pub fn ensure_connected(&mut self) -> bool {
        if self.connection.is_some() {
            return true;
        }

        if self.failed_connect_attempts == 0 {
            self.record(
                Level::DEBUG,
                "attempting to open channel for the first time",
                &[("endpoint", self.connector.endpoint().to_string())],
            );
        }

        match self.connector.open() {
            Ok(mut connection) => {
                if let Err(err) = connection.set_write_timeout(self.config.write_timeout) {
                    self.record(
                        Level::WARN,
                        "failed to apply write timeout",
                        &[("error", err.to_string())],
                    );
                }
                let handle = connection.handle_id();
                self.connection = Some(connection);
                self.record(
                    Level::INFO,
                    "connected",
                    &[
                        ("endpoint", self.connector.endpoint().to_string()),
                        ("handle", handle),
                        ("failed_connect_attempts", self.failed_connect_attempts.to_string()),
                    ],
                );
                true
            }
            Err(err) if err.is_transient() => {
                let interval = self.config.effective_log_interval();
                if self.failed_connect_attempts % interval == 0 {
                    let attempt = self.failed_connect_attempts.saturating_add(1);
                    self.record(
                        Level::INFO,
                        "channel unavailable",
                        &[
                            ("endpoint", self.connector.endpoint().to_string()),
                            ("attempt", attempt.to_string()),
                            ("error", err.to_string()),
                        ],
                    );
                }
                self.failed_connect_attempts = self.failed_connect_attempts.saturating_add(1);
                false
            }
            Err(err) => {
                self.record(
                    Level::WARN,
                    "failed to open channel",
                    &[
                        ("endpoint", self.connector.endpoint().to_string()),
                        ("error", err.to_string()),
                    ],
                );
                self.failed_connect_attempts = self.failed_connect_attempts.saturating_add(1);
                false
            }
        }
    }

    /// Drop the connection if one is held.
    pub fn disconnect(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        let handle = connection.handle_id();
        drop(connection);

        let buffered = self.pending.len();
        let discarded = if self.config.clear_residual_on_disconnect {
            self.pending.clear();
            buffered
        } else {
            0
        };
        self.record(
            Level::INFO,
            "disconnected",
            &[
                ("handle", handle),
                ("discarded_bytes", discarded.to_string()),
            ],
        );
    }

    /// Send one line to the counterpart.
    ///
    /// Returns `true` only when the whole frame was written by a single
    /// write call. On any failure the connection is torn down.
    pub fn send_line(&mut self, payload: &str) -> bool {
        if payload.is_empty() {
            self.record(Level::DEBUG, "refusing to send empty message", &[]);
            return false;
        }
        if !self.ensure_connected() {
            return false;
        }

        self.write_buf.clear();
        encode_line(payload, &mut self.write_buf);
        let expected = self.write_buf.len();

        let result = match self.connection.as_mut() {
            Some(connection) => connection.write_chunk(&self.write_buf),
            None => return false,
        };

        match result {
            Ok(written) if written == expected => true,
            Ok(written) => {
                self.record(
                    Level::WARN,
                    "short write",
                    &[
                        ("written", written.to_string()),
                        ("expected", expected.to_string()),
                    ],
                );
                self.disconnect();
                false
            }
            Err(err) => {
                self.record(
                    Level::WARN,
                    "write failed",
                    &[
                        ("written", "0".to_string()),
                        ("expected", expected.to_string()),
                        ("error", err.to_string()),
                    ],
                );
                self.disconnect();
                false
            }
        }
    }

    /// Service inbound traffic once.
    ///
    /// Reads at most one bounded chunk and dispatches at most one command
    /// unless the drain-all policy is configured.
    pub fn poll<S: CommandSink + ?Sized>(&mut self, sink: &mut S) -> PollOutcome {
        if !self.ensure_connected() {
            return PollOutcome::Disconnected;
        }
        match self.config.poll_policy {
            PollPolicy::OnePerPoll => self.poll_one(sink),
            PollPolicy::DrainAll => self.poll_drain(sink),
        }
    }

    fn poll_one<S: CommandSink + ?Sized>(&mut self, sink: &mut S) -> PollOutcome {
        if let Some(command) = self.pending.next_command() {
            self.dispatch(sink, &command);
            return PollOutcome::Dispatched(1);
        }

        match self.read_available() {
            ReadStep::Failed => PollOutcome::Disconnected,
            ReadStep::Empty => PollOutcome::Idle,
            ReadStep::Read => match self.pending.next_command() {
                Some(command) => {
                    self.dispatch(sink, &command);
                    PollOutcome::Dispatched(1)
                }
                None => PollOutcome::Pending,
            },
        }
    }

    fn poll_drain<S: CommandSink + ?Sized>(&mut self, sink: &mut S) -> PollOutcome {
        let mut read_any = false;
        for _ in 0..MAX_DRAIN_READS {
            match self.read_available() {
                ReadStep::Failed => return PollOutcome::Disconnected,
                ReadStep::Empty => break,
                ReadStep::Read => read_any = true,
            }
        }

        let mut dispatched = 0;
        while let Some(command) = self.pending.next_command() {
            self.dispatch(sink, &command);
            dispatched += 1;
        }

        if dispatched > 0 {
            PollOutcome::Dispatched(dispatched)
        } else if read_any {
            PollOutcome::Pending
        } else {
            PollOutcome::Idle
        }
    }

    fn read_available(&mut self) -> ReadStep {
        let probe = match self.connection.as_mut() {
            Some(connection) => connection.bytes_available(),
            None => return ReadStep::Failed,
        };
        let available = match probe {
            Ok(0) => return ReadStep::Empty,
            Ok(available) => available,
            Err(err) => {
                self.record(
                    Level::WARN,
                    "availability check failed",
                    &[("error", err.to_string())],
                );
                self.disconnect();
                return ReadStep::Failed;
            }
        };

        let want = available.min(self.read_buf.len());
        let result = match self.connection.as_mut() {
            Some(connection) => connection.read_chunk(&mut self.read_buf[..want]),
            None => return ReadStep::Failed,
        };

        match result {
            Ok(0) => {
                self.record(
                    Level::WARN,
                    "read returned no data",
                    &[("available", available.to_string())],
                );
                self.disconnect();
                ReadStep::Failed
            }
            Ok(read) => {
                self.pending.feed(&self.read_buf[..read]);
                ReadStep::Read
            }
            Err(err) => {
                self.record(
                    Level::WARN,
                    "read failed",
                    &[
                        ("requested", want.to_string()),
                        ("error", err.to_string()),
                    ],
                );
                self.disconnect();
                ReadStep::Failed
            }
        }
    }

    fn dispatch<S: CommandSink + ?Sized>(&self, sink: &mut S, command: &str) {
        self.record(
            Level::DEBUG,
            "received command",
            &[("command", json_escape(command))],
        );
        sink.handle_command(command);
    }

    /// Close the connection and report the final state.
    ///
    /// Runs automatically when the manager is dropped while connected.
    pub fn shutdown(&mut self, context: Option<&str>) {
        let context = context
            .filter(|context| !context.is_empty())
            .unwrap_or(DEFAULT_SHUTDOWN_CONTEXT);
        self.record(
            Level::INFO,
            "shutting down",
            &[
                ("context", context.to_string()),
                ("handle", self.handle_label()),
            ],
        );
        self.disconnect();
        self.log_state("shutdown (post)", self.is_connected());
    }

    /// Record the current handle and attempt counter under `context`.
    pub fn log_state(&self, context: &str, active: bool) {
        self.record(
            Level::DEBUG,
            context,
            &[
                ("active", active.to_string()),
                ("handle", self.handle_label()),
                ("failed_connect_attempts", self.failed_connect_attempts.to_string()),
            ],
        );
    }

    /// Serialize and send a status message.
    pub fn send_status(&mut self, message: &StatusMessage) -> bool {
        if !self.ensure_connected() {
            let context = format!("no connection; skipping {} payload", message.kind());
            self.record(Level::DEBUG, &context, &[("turn", turn_label(message))]);
            return false;
        }

        let line = match message.to_line() {
            Ok(line) => line,
            Err(err) => {
                self.record(
                    Level::WARN,
                    "failed to serialize status",
                    &[("kind", message.kind().to_string()), ("error", err.to_string())],
                );
                return false;
            }
        };

        let sent = self.send_line(&line);
        if sent {
            self.record(
                Level::DEBUG,
                "status sent",
                &[
                    ("kind", message.kind().to_string()),
                    ("turn", turn_label(message)),
                    ("bytes", (line.len() + 1).to_string()),
                ],
            );
        }
        sent
    }

    /// Announce the start of `turn` for `player`, with a snapshot of game state.
    pub fn send_turn_start<T: Serialize + ?Sized>(
        &mut self,
        turn: i32,
        player: i32,
        state: &T,
    ) -> bool {
        let Some(state) = self.snapshot(state) else {
            return false;
        };
        self.send_status(&StatusMessage::TurnStart {
            turn,
            player,
            state,
        })
    }

    /// Announce that `player` finished `turn`, naming who moves next.
    pub fn send_turn_complete<T: Serialize + ?Sized>(
        &mut self,
        turn: i32,
        player: i32,
        active_player: i32,
        active_player_name: &str,
        is_human: bool,
        state: &T,
    ) -> bool {
        let Some(state) = self.snapshot(state) else {
            return false;
        };
        self.send_status(&StatusMessage::TurnComplete {
            turn,
            player,
            active_player,
            active_player_name: active_player_name.to_string(),
            is_human,
            state,
        })
    }

    /// Send a free-form sample payload.
    pub fn send_sample<T: Serialize + ?Sized>(&mut self, data: &T) -> bool {
        let Some(data) = self.snapshot(data) else {
            return false;
        };
        self.send_status(&StatusMessage::Sample { data })
    }

    fn snapshot<T: Serialize + ?Sized>(&self, value: &T) -> Option<serde_json::Value> {
        match serde_json::to_value(value) {
            Ok(value) => Some(value),
            Err(err) => {
                self.record(
                    Level::WARN,
                    "failed to serialize status",
                    &[("error", err.to_string())],
                );
                None
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.connection.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Consecutive failed connect attempts since the last `initialize`.
    pub fn failed_connect_attempts(&self) -> u32 {
        self.failed_connect_attempts
    }

    /// Bytes read but not yet consumed as complete lines.
    pub fn pending_bytes(&self) -> usize {
        self.pending.len()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn handle_label(&self) -> String {
        match &self.connection {
            Some(connection) => connection.handle_id(),
            None => "none".to_string(),
        }
    }

    fn record(&self, level: Level, context: &str, fields: &[(&'static str, String)]) {
        self.diagnostics.record(level, context, fields);
    }
}

fn turn_label(message: &StatusMessage) -> String {
    message
        .turn()
        .map_or_else(|| "-".to_string(), |turn| turn.to_string())
}

impl<C: Connector, D: Diagnostics> Drop for ChannelManager<C, D> {
    fn drop(&mut self) {
        if self.connection.is_some() {
            self.shutdown(Some("drop"));
        }
    }
}

impl<C: Connector, D: Diagnostics> fmt::Debug for ChannelManager<C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelManager")
            .field("endpoint", self.connector.endpoint())
            .field("state", &self.state())
            .field("failed_connect_attempts", &self.failed_connect_attempts)
            .field("pending_bytes", &self.pending.len())
            .field("config", &self.config)
            .finish()
    }
}
