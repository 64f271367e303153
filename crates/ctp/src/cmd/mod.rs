use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use ctp_transport::DEFAULT_DEVICE_PORT;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod version;
pub mod wifi;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one message to a device, optionally waiting for the reply.
    Send(SendArgs),
    /// Push WiFi station credentials (and an optional MQTT broker).
    Wifi(WifiArgs),
    /// Act as a device: accept connections and print received messages.
    ///
    /// Ctrl-C stops at once while waiting for a client. With a client
    /// connected it stops after the client's next message or idle timeout;
    /// press Ctrl-C again to exit immediately.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Wifi(args) => wifi::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where the device listens.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Device host name or IP address.
    #[arg(env = "CTP_HOST")]
    pub host: String,
    /// Device TCP port.
    #[arg(long, short = 'p', default_value_t = DEFAULT_DEVICE_PORT, env = "CTP_PORT")]
    pub port: u16,
    /// Connection timeout (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Topic to send on.
    #[arg(long, short = 't')]
    pub topic: String,
    /// JSON payload (validated, sent verbatim).
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from a UTF-8 file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// Wait for one response message and print it.
    #[arg(long)]
    pub wait: bool,
    /// Deadline for the whole response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct WifiArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Network name the device should join.
    #[arg(long)]
    pub ssid: String,
    /// Network password.
    #[arg(long, env = "CTP_WIFI_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Firmware-specific status flag, sent verbatim.
    #[arg(long, default_value = "1")]
    pub status: String,
    /// MQTT broker host the device should report to.
    #[arg(long, requires = "mqtt_port")]
    pub mqtt_server: Option<String>,
    /// MQTT broker port.
    #[arg(long, requires = "mqtt_server")]
    pub mqtt_port: Option<u16>,
    /// Deadline for the device's answer (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to bind, e.g. 0.0.0.0:3333.
    pub addr: String,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Answer each message with an identical copy.
    #[arg(long, conflicts_with = "reply")]
    pub echo: bool,
    /// Answer each message with this payload.
    #[arg(long)]
    pub reply: Option<String>,
    /// Topic for --reply answers. Default: the received topic.
    #[arg(long, requires = "reply")]
    pub reply_topic: Option<String>,
    /// Drop a client that stays silent this long (e.g. 30s).
    #[arg(long, default_value = "300s")]
    pub idle_timeout: String,
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
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration(" 5s ").unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
        assert_eq!(parse_duration("1m").unwrap_err().code, USAGE);
    }
}
