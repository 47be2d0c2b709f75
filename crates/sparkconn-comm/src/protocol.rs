//! Comm message protocol parsing
//!
//! Inbound messages are JSON objects keyed by `msgtype`; every other field is
//! the payload of that message type.

use serde::Deserialize;
use serde_json::{Map, Value};

use sparkconn_core::prelude::*;
use sparkconn_core::CommMessage;

/// Envelope split into its type tag and the remaining payload fields
#[derive(Debug, Deserialize)]
struct RawMessage {
    msgtype: String,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

// ─────────────────────────────────────────────────────────
// Comm Protocol Parsing (Free Functions)
// ─────────────────────────────────────────────────────────

/// Parses one inbound comm message.
///
/// # Returns
/// * `Ok(CommMessage::Unknown { .. })` for a well-formed envelope whose
///   `msgtype` is not recognized
/// * `Err(Error::Protocol)` when the envelope has no `msgtype` or a known
///   message type carries a malformed payload
pub fn parse_comm_message(value: Value) -> Result<CommMessage> {
    let raw: RawMessage = match value {
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| Error::protocol(format!("invalid message envelope: {}", e)))?,
        other => {
            return Err(Error::protocol(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };

    parse_payload(&raw.msgtype, Value::Object(raw.payload))
}

/// Parse a payload by message type
fn parse_payload(msgtype: &str, payload: Value) -> Result<CommMessage> {
    let parsed = match msgtype {
        "open" => serde_json::from_value(payload).map(CommMessage::Open),
        "connected" => serde_json::from_value(payload).map(CommMessage::Connected),
        "connect-error" => serde_json::from_value(payload).map(CommMessage::ConnectError),
        "follow-log" => serde_json::from_value(payload).map(CommMessage::FollowLog),
        _ => {
            return Ok(CommMessage::Unknown {
                msgtype: msgtype.to_string(),
                payload,
            })
        }
    };

    parsed.map_err(|e| Error::protocol(format!("malformed '{}' payload: {}", msgtype, e)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
