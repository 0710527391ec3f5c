use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;
use tickpipe_frame::json_escape;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One status line received by the counterpart side.
#[derive(Serialize)]
struct StatusOutput<'a> {
    kind: &'a str,
    turn: Option<i64>,
    size: usize,
    payload: Value,
    timestamp: String,
}

/// One command dispatched to the host side.
#[derive(Serialize)]
struct CommandOutput<'a> {
    turn: i32,
    command: &'a str,
    timestamp: String,
}

#[derive(Serialize)]
struct SendOutput<'a> {
    endpoint: String,
    bytes: usize,
    payload: &'a str,
}

/// Print a status line as received by `listen`.
pub fn print_status(line: &str, format: OutputFormat) {
    let payload = serde_json::from_str::<Value>(line)
        .unwrap_or_else(|_| Value::String(line.to_string()));
    let kind = payload
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("-");
    let turn = payload.get("turn").and_then(Value::as_i64);
    let size = frame_size(line);

    match format {
        OutputFormat::Json => {
            let out = StatusOutput {
                kind,
                turn,
                size,
                payload: payload.clone(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "TURN", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    kind.to_string(),
                    turn_cell(turn),
                    size.to_string(),
                    line.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "type={} turn={} size={} payload=\"{}\"",
                kind,
                turn_cell(turn),
                size,
                json_escape(line)
            );
        }
        OutputFormat::Raw => print_line(line),
    }
}

/// Print a command dispatched to the host during `turn`.
pub fn print_command(turn: i32, command: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = CommandOutput {
                turn,
                command,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TURN", "COMMAND"])
                .add_row(vec![turn.to_string(), command.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("turn={} command=\"{}\"", turn, json_escape(command));
        }
        OutputFormat::Raw => print_line(command),
    }
}

/// Print the outcome of a successful one-shot send.
pub fn print_sent(endpoint: &str, payload: &str, format: OutputFormat) {
    let bytes = frame_size(payload);
    match format {
        OutputFormat::Json => {
            let out = SendOutput {
                endpoint: endpoint.to_string(),
                bytes,
                payload,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENDPOINT", "BYTES", "PAYLOAD"])
                .add_row(vec![endpoint.to_string(), bytes.to_string(), payload.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "sent endpoint={} bytes={} payload=\"{}\"",
                endpoint,
                bytes,
                json_escape(payload)
            );
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_line(text: &str) {
    let mut out = std::io::stdout();
    let _ = out.write_all(text.as_bytes());
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

/// Bytes the line occupies on the wire, terminator included.
fn frame_size(line: &str) -> usize {
    line.len() + usize::from(!line.ends_with('\n'))
}

fn turn_cell(turn: Option<i64>) -> String {
    turn.map_or_else(|| "-".to_string(), |turn| turn.to_string())
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
