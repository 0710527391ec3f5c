use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use tickpipe_channel::DEFAULT_READ_CHUNK_SIZE;
use tickpipe_transport::Endpoint;

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod host;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulated host loop against a counterpart.
    Host(HostArgs),
    /// Play the counterpart: accept a host, send commands, print status lines.
    Listen(ListenArgs),
    /// Send a single line through a channel manager.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Host(args) => host::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct HostArgs {
    /// Channel to open (pipe:NAME, unix:PATH, tcp:HOST:PORT). Default: platform channel.
    pub endpoint: Option<Endpoint>,
    /// Number of turns to run. Default: until Ctrl-C.
    #[arg(long)]
    pub ticks: Option<u32>,
    /// Time between turns (e.g. 100ms, 1s).
    #[arg(long, default_value = "100ms")]
    pub tick: String,
    /// Dispatch every available command each turn instead of one.
    #[arg(long)]
    pub drain: bool,
    /// Maximum bytes per read.
    #[arg(long, default_value_t = DEFAULT_READ_CHUNK_SIZE)]
    pub chunk_size: usize,
    /// Keep partial input across reconnects.
    #[arg(long)]
    pub keep_residual: bool,
    /// Stop after this command is received.
    #[arg(long, value_name = "COMMAND")]
    pub until: Option<String>,
    /// Name reported as the active player in turn_complete messages.
    #[arg(long, default_value = "Player 1")]
    pub player_name: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Endpoint to bind (unix:PATH or tcp:HOST:PORT).
    pub endpoint: Option<Endpoint>,
    /// Command line to send to each host after it connects (repeatable).
    #[arg(long = "command", value_name = "TEXT")]
    pub commands: Vec<String>,
    /// Exit after receiving N status lines.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Channel to open. Default: platform channel.
    pub endpoint: Option<Endpoint>,
    /// JSON payload, sent compacted onto one line.
    #[arg(long, conflicts_with = "data", required_unless_present = "data")]
    pub json: Option<String>,
    /// Raw single-line payload.
    #[arg(long, conflicts_with = "json")]
    pub data: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("  ").is_err());
    }
}
