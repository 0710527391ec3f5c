use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use serde_json::json;
use tickpipe_channel::{ChannelConfig, ChannelManager, PollPolicy};
use tickpipe_transport::EndpointConnector;

use crate::cmd::{install_ctrlc_handler, parse_duration, HostArgs};
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_command, OutputFormat};

pub fn run(args: HostArgs, format: OutputFormat) -> CliResult<i32> {
    let tick = parse_duration(&args.tick)?;
    if args.chunk_size == 0 {
        return Err(CliError::new(USAGE, "--chunk-size must be greater than zero"));
    }

    let endpoint = args.endpoint.clone().unwrap_or_default();
    let connector = EndpointConnector::new(endpoint.clone());
    if !connector.is_supported() {
        return Err(CliError::new(
            USAGE,
            format!("{endpoint} is not supported on {}", std::env::consts::OS),
        ));
    }

    let config = channel_config(&args);
    let mut channel = ChannelManager::with_config(connector, config);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    tracing::info!(%endpoint, tick_ms = tick.as_millis() as u64, "host loop starting");
    channel.initialize();

    let started = Instant::now();
    let mut turn: i32 = 0;
    let mut stop_requested = false;

    while running.load(Ordering::SeqCst) && !stop_requested {
        if args.ticks.is_some_and(|ticks| turn >= i32::try_from(ticks).unwrap_or(i32::MAX)) {
            break;
        }
        turn = turn.saturating_add(1);

        let state = json!({
            "tick": turn,
            "elapsedMs": started.elapsed().as_millis() as u64,
            "connected": channel.is_connected(),
        });
        channel.send_turn_start(turn, 0, &state);

        let mut commands: Vec<String> = Vec::new();
        channel.poll(&mut commands);
        for command in &commands {
            print_command(turn, command, format);
            if args.until.as_deref() == Some(command.as_str()) {
                stop_requested = true;
            }
        }

        if !stop_requested {
            thread::sleep(tick);
        }
    }

    let state = json!({
        "tick": turn,
        "elapsedMs": started.elapsed().as_millis() as u64,
    });
    channel.send_turn_complete(turn, 0, 1, &args.player_name, true, &state);

    let reason = if stop_requested {
        "stop command received"
    } else if running.load(Ordering::SeqCst) {
        "turn limit reached"
    } else {
        "interrupted"
    };
    channel.shutdown(Some(reason));
    tracing::info!(turns = turn, reason, "host loop finished");

    Ok(SUCCESS)
}

fn channel_config(args: &HostArgs) -> ChannelConfig {
    ChannelConfig {
        read_chunk_size: args.chunk_size,
        poll_policy: if args.drain {
            PollPolicy::DrainAll
        } else {
            PollPolicy::OnePerPoll
        },
        clear_residual_on_disconnect: !args.keep_residual,
        ..ChannelConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> HostArgs {
        HostArgs {
            endpoint: None,
            ticks: Some(1),
            tick: "10ms".to_string(),
            drain: false,
            chunk_size: 256,
            keep_residual: false,
            until: None,
            player_name: "Player 1".to_string(),
        }
    }

    #[test]
    fn flags_map_onto_channel_config() {
        let defaults = channel_config(&args());
        assert_eq!(defaults, ChannelConfig::default());

        let tuned = channel_config(&HostArgs {
            drain: true,
            chunk_size: 16,
            keep_residual: true,
            ..args()
        });
        assert_eq!(tuned.poll_policy, PollPolicy::DrainAll);
        assert_eq!(tuned.read_chunk_size, 16);
        assert!(!tuned.clear_residual_on_disconnect);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = run(
            HostArgs {
                chunk_size: 0,
                ..args()
            },
            OutputFormat::Json,
        )
        .expect_err("zero chunk size should fail");
        assert_eq!(err.code, USAGE);
    }
}
