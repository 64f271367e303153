use std::io::{IsTerminal, Write};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ctp_frame::{is_known, topic_name, Message};
use ctp_session::{DeviceCommand, ProvisionOutcome};
use serde::Serialize;

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

#[derive(Serialize)]
struct MessageOutput<'a> {
    schema_id: &'a str,
    topic: &'a str,
    topic_name: &'a str,
    known_topic: bool,
    payload_size: usize,
    payload: &'a str,
    peer: String,
    timestamp: String,
}

#[derive(Serialize)]
struct OutcomeOutput<'a> {
    schema_id: &'a str,
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    response: &'a DeviceCommand,
    peer: String,
    timestamp: String,
}

pub fn print_message(message: &Message, peer: Option<SocketAddr>, format: OutputFormat) {
    let peer = peer_label(peer);
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                schema_id: "https://schemas.3leaps.dev/ctp/cli/v1/message-received.schema.json",
                topic: &message.topic,
                topic_name: topic_name(&message.topic),
                known_topic: is_known(&message.topic),
                payload_size: message.payload.len(),
                payload: &message.payload,
                peer,
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
                .set_header(vec!["TOPIC", "SIZE", "PEER", "PAYLOAD"])
                .add_row(vec![
                    topic_name(&message.topic).to_string(),
                    message.payload.len().to_string(),
                    peer,
                    message.payload.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "topic={} size={} peer={} payload={}",
                topic_name(&message.topic),
                message.payload.len(),
                peer,
                message.payload
            );
        }
        OutputFormat::Raw => {
            print_raw(message.payload.as_bytes());
        }
    }
}

pub fn print_outcome(outcome: &ProvisionOutcome, peer: Option<SocketAddr>, format: OutputFormat) {
    let peer = peer_label(peer);
    let error = match outcome {
        ProvisionOutcome::Accepted { .. } => None,
        ProvisionOutcome::Rejected { error, .. } => Some(error.as_str()),
    };
    let verdict = if outcome.is_accepted() {
        "accepted"
    } else {
        "rejected"
    };

    match format {
        OutputFormat::Json => {
            let out = OutcomeOutput {
                schema_id: "https://schemas.3leaps.dev/ctp/cli/v1/provision-outcome.schema.json",
                accepted: outcome.is_accepted(),
                error,
                response: outcome.response(),
                peer,
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
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["result".to_string(), verdict.to_string()])
                .add_row(vec!["peer".to_string(), peer]);
            if let Some(error) = error {
                table.add_row(vec!["error".to_string(), error.to_string()]);
            }
            if let Some(params) = outcome.response().param.as_object() {
                for (key, value) in params {
                    table.add_row(vec![key.clone(), param_text(key, value)]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => match error {
            None => println!("{verdict} peer={peer}"),
            Some(error) => println!("{verdict} peer={peer} error={error}"),
        },
        OutputFormat::Raw => {
            let payload = outcome.response().to_payload().unwrap_or_default();
            print_raw(payload.as_bytes());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

// Devices echo settings back, sometimes with the password masked; never
// print it in the table view either way.
fn param_text(key: &str, value: &serde_json::Value) -> String {
    if key == "pwd" {
        return "<redacted>".to_string();
    }
    match value.as_str() {
        Some(text) => text.to_string(),
        None => value.to_string(),
    }
}

fn peer_label(peer: Option<SocketAddr>) -> String {
    peer.map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
