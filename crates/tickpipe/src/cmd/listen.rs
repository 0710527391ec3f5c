use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tickpipe_frame::{encode_line, Line, LineBuffer};
use tickpipe_transport::{IpcStream, Listener};

use crate::cmd::{install_ctrlc_handler, ListenArgs};
use crate::exit::{io_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_status, OutputFormat};

/// How often a blocked read wakes up to check for Ctrl-C.
const READ_WAKEUP: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = args.endpoint.clone().unwrap_or_default();
    let listener = Listener::bind(&endpoint).map_err(|err| transport_error("bind failed", err))?;
    let bound = listener
        .local_endpoint()
        .map_err(|err| transport_error("bind failed", err))?;
    tracing::info!(endpoint = %bound, "listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let stream = listener
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        tracing::info!(transport = stream.transport_name(), "host connected");

        send_commands(&stream, &args.commands);

        stream
            .set_read_timeout(Some(READ_WAKEUP))
            .map_err(|err| transport_error("configure stream failed", err))?;

        let mut reader = stream;
        let mut lines = LineBuffer::new();
        let mut chunk = [0u8; 4096];

        'session: while running.load(Ordering::SeqCst) {
            let n = match reader.read(&mut chunk) {
                Ok(0) => {
                    tracing::info!("host disconnected");
                    break 'session;
                }
                Ok(n) => n,
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(err) if err.kind() == io::ErrorKind::ConnectionReset => {
                    tracing::info!("host connection reset");
                    break 'session;
                }
                Err(err) => return Err(io_error("receive failed", err)),
            };

            lines.feed(&chunk[..n]);
            while let Some(line) = lines.try_extract_one() {
                let Line::Command(text) = line else {
                    continue;
                };
                print_status(&text, format);
                printed = printed.saturating_add(1);

                if args.count.is_some_and(|count| printed >= count) {
                    return Ok(SUCCESS);
                }
            }
        }
    }

    Ok(SUCCESS)
}

/// Write the configured commands to a freshly accepted host.
///
/// A host that already went away is not an error for the listener.
fn send_commands(stream: &IpcStream, commands: &[String]) {
    if commands.is_empty() {
        return;
    }

    let mut frames = BytesMut::new();
    for command in commands {
        encode_line(command, &mut frames);
    }

    let result = stream.try_clone().map_err(io::Error::other).and_then(|mut writer| {
        writer.write_all(&frames)?;
        writer.flush()
    });
    match result {
        Ok(()) => tracing::debug!(count = commands.len(), bytes = frames.len(), "sent commands"),
        Err(err) => tracing::warn!(error = %err, "failed to send commands"),
    }
}
