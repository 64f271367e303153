use ctp_session::{connect_with_config, provision_wifi, SessionConfig, StaSsidInfo};

use crate::cmd::{parse_duration, WifiArgs};
use crate::exit::{provision_error, session_error, CliResult, DEVICE_REJECTED, SUCCESS};
use crate::output::{print_outcome, OutputFormat};

pub fn run(args: WifiArgs, format: OutputFormat) -> CliResult<i32> {
    let config = SessionConfig {
        connect_timeout: parse_duration(&args.target.connect_timeout)?,
        response_timeout: parse_duration(&args.timeout)?,
        ..SessionConfig::default()
    };
    let info = station_info(&args);

    let mut session = connect_with_config(&args.target.host, args.target.port, config)
        .map_err(|err| session_error("connect failed", err))?;

    let outcome =
        provision_wifi(&mut session, &info).map_err(|err| provision_error("wifi failed", err))?;
    print_outcome(&outcome, session.peer_addr(), format);
    session.disconnect();

    if outcome.is_accepted() {
        Ok(SUCCESS)
    } else {
        Ok(DEVICE_REJECTED)
    }
}

fn station_info(args: &WifiArgs) -> StaSsidInfo {
    let info = StaSsidInfo::new(&args.ssid, &args.password).with_status(&args.status);
    match (&args.mqtt_server, args.mqtt_port) {
        (Some(server), Some(port)) => info.with_mqtt(server, port),
        _ => info,
    }
}
