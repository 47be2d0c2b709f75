//! Test utilities for comm types
//!
//! Provides helpers for building backend messages and driving loopback peers.

use serde_json::{json, Value};

use crate::transport::BackendPeer;

/// An `open` message asking for the configuration page.
///
/// # Arguments
/// * `bundles` - Names of the bundles the backend offers (no options, no cluster filter)
pub fn open_config_message(bundles: &[&str]) -> Value {
    let availablebundles: serde_json::Map<String, Value> = bundles
        .iter()
        .map(|name| (name.to_string(), json!({"options": []})))
        .collect();

    json!({
        "msgtype": "open",
        "page": "config",
        "maxmemory": "8g",
        "sparkversion": "3.3.1",
        "cluster": "analytix",
        "availableoptions": {"memory": ["spark.executor.memory", "spark.driver.memory"]},
        "availablebundles": availablebundles,
    })
}

/// An `open` message reporting that the backend is already connected.
pub fn open_connected_message() -> Value {
    json!({"msgtype": "open", "page": "connected"})
}

/// A `connected` message, optionally carrying a history server URL.
pub fn connected_message(history_server: Option<&str>) -> Value {
    match history_server {
        Some(url) => json!({"msgtype": "connected", "config": {"sparkhistoryserver": url}}),
        None => json!({"msgtype": "connected"}),
    }
}

/// A `connect-error` message.
pub fn connect_error_message(error: &str) -> Value {
    json!({"msgtype": "connect-error", "error": error})
}

/// A `follow-log` message.
pub fn follow_log_message(line: &str) -> Value {
    json!({"msgtype": "follow-log", "msg": line})
}

/// Drain every action the frontend has sent so far, returning their names.
pub fn drain_actions(peer: &mut BackendPeer) -> Vec<String> {
    let mut names = Vec::new();
    while let Some(value) = peer.try_recv() {
        if let Some(action) = value.get("action").and_then(Value::as_str) {
            names.push(action.to_string());
        }
    }
    names
}
