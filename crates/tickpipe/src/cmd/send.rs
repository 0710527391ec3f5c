use tickpipe_channel::ChannelManager;
use tickpipe_transport::EndpointConnector;

use crate::cmd::SendArgs;
use crate::exit::{json_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let endpoint = args.endpoint.clone().unwrap_or_default();

    let mut channel = ChannelManager::new(EndpointConnector::new(endpoint.clone()));
    channel.initialize();
    if !channel.send_line(&payload) {
        return Err(CliError::new(
            FAILURE,
            format!("send failed: no counterpart accepted the line on {endpoint}"),
        ));
    }
    channel.shutdown(Some("send complete"));

    print_sent(&endpoint.to_string(), &payload, format);
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<String> {
    if let Some(json) = &args.json {
        let value = serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return serde_json::to_string(&value).map_err(|err| json_error("encode failed", err));
    }

    let data = args.data.as_deref().unwrap_or_default();
    if data.is_empty() {
        return Err(CliError::new(USAGE, "payload must not be empty"));
    }
    if data.contains('\n') {
        return Err(CliError::new(USAGE, "--data must be a single line"));
    }
    Ok(data.to_string())
}
