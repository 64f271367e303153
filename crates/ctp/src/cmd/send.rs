use std::fs;

use ctp_session::{connect_with_config, SessionConfig};
use tracing::debug;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{io_error, session_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let config = SessionConfig {
        connect_timeout: parse_duration(&args.target.connect_timeout)?,
        response_timeout: parse_duration(&args.timeout)?,
        ..SessionConfig::default()
    };
    let payload = resolve_payload(&args)?;

    let mut session = connect_with_config(&args.target.host, args.target.port, config)
        .map_err(|err| session_error("connect failed", err))?;

    session
        .send_message(&args.topic, &payload)
        .map_err(|err| session_error("send failed", err))?;
    debug!(topic = %args.topic, size = payload.len(), "message sent");

    if args.wait {
        let reply = session
            .receive_response()
            .map_err(|err| session_error("receive failed", err))?;
        print_message(&reply, session.peer_addr(), format);
    }

    session.disconnect();
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<String> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.clone());
    }
    if let Some(data) = &args.data {
        return Ok(data.clone());
    }
    if let Some(path) = &args.file {
        let bytes =
            fs::read(path).map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        return String::from_utf8(bytes).map_err(|err| {
            CliError::new(
                DATA_INVALID,
                format!("{} is not valid UTF-8: {}", path.display(), err.utf8_error()),
            )
        });
    }
    Ok(String::new())
}
