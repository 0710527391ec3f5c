mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "tickpipe", version, about = "Tick-driven host/counterpart channel CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format.
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level.
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Append logs to this file instead of stderr.
    #[arg(long, value_name = "PATH", global = true, env = "TICKPIPE_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_logging(cli.log_format, cli.log_level, cli.log_file.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(err.code);
    }

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickpipe_transport::Endpoint;

    #[test]
    fn parses_host_subcommand() {
        let cli = Cli::try_parse_from([
            "tickpipe",
            "host",
            "unix:/tmp/game.sock",
            "--ticks",
            "5",
            "--tick",
            "50ms",
            "--drain",
            "--chunk-size",
            "64",
        ])
        .expect("host args should parse");

        let Command::Host(args) = cli.command else {
            panic!("expected host command");
        };
        assert_eq!(args.endpoint, Some(Endpoint::Unix("/tmp/game.sock".into())));
        assert_eq!(args.ticks, Some(5));
        assert!(args.drain);
        assert_eq!(args.chunk_size, 64);
        assert!(!args.keep_residual);
    }

    #[test]
    fn host_endpoint_is_optional() {
        let cli = Cli::try_parse_from(["tickpipe", "host"]).expect("bare host should parse");
        let Command::Host(args) = cli.command else {
            panic!("expected host command");
        };
        assert_eq!(args.endpoint, None);
        assert_eq!(args.tick, "100ms");
        assert_eq!(args.chunk_size, 256);
    }

    #[test]
    fn listen_accepts_repeated_commands() {
        let cli = Cli::try_parse_from([
            "tickpipe",
            "listen",
            "tcp:127.0.0.1:7777",
            "--command",
            "select 3",
            "--command",
            "end_turn",
            "--count",
            "2",
        ])
        .expect("listen args should parse");

        let Command::Listen(args) = cli.command else {
            panic!("expected listen command");
        };
        assert_eq!(args.commands, vec!["select 3", "end_turn"]);
        assert_eq!(args.count, Some(2));
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "tickpipe",
            "send",
            "unix:/tmp/test.sock",
            "--json",
            "{\"x\":1}",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn send_requires_a_payload() {
        let err = Cli::try_parse_from(["tickpipe", "send", "unix:/tmp/test.sock"])
            .expect_err("missing payload should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rejects_malformed_endpoint() {
        let err = Cli::try_parse_from(["tickpipe", "send", "tcp:not-an-addr", "--data", "x"])
            .expect_err("bad endpoint should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tickpipe",
            "version",
            "--format",
            "json",
            "--log-level",
            "debug",
            "--log-file",
            "/tmp/tickpipe.log",
        ])
        .expect("global flags should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/tickpipe.log")));
    }
}
