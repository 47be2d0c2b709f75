//! Headless mode - JSON event output for scripted testing
//!
//! The runner reads host and backend events as NDJSON on stdin and reports
//! what the coordinator did as NDJSON on stdout, one event per line. Each
//! event has an "event" field indicating its type.
//!
//! # Example Output
//!
//! ```json
//! {"event":"phase","phase":"loading","document":null,"view":"Loading...","timestamp":1704700001000}
//! {"event":"session_created","document":"nb1","session_id":1,"timestamp":1704700002000}
//! {"event":"sent","document":"nb1","action":"open","data":null,"timestamp":1704700002001}
//! ```

pub mod commands;
pub mod runner;
pub mod simulator;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};
use tracing::error;

use sparkconn_app::EngineEvent;
use sparkconn_core::{Error, SavedConfiguration};

/// How the runner reports coordinator activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// NDJSON events on stdout
    Json,
    /// Rendered phases on stdout, errors on stderr
    Text,
}

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// The displayed phase changed
    Phase {
        phase: String,
        document: Option<String>,
        view: String,
        timestamp: i64,
    },

    /// A session was registered for a document
    SessionCreated {
        document: String,
        session_id: u64,
        timestamp: i64,
    },

    /// A session was removed
    SessionRemoved {
        document: String,
        session_id: u64,
        timestamp: i64,
    },

    /// All sessions were discarded after a backend restart
    Reset { generation: u64, timestamp: i64 },

    /// The coordinator sent an action to a backend
    Sent {
        document: String,
        action: String,
        data: Option<Value>,
        timestamp: i64,
    },

    /// Connection parameters were saved to document metadata
    ConfigurationSaved {
        document: String,
        configuration: SavedConfiguration,
        timestamp: i64,
    },

    /// Backend log line shown on the Connecting or Connected phase
    Log {
        document: String,
        message: String,
        timestamp: i64,
    },

    /// Error occurred
    Error {
        message: String,
        document: Option<String>,
        fatal: bool,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        // Write to stdout with newline (NDJSON format)
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Report this event in the given output mode
    pub fn publish(&self, mode: OutputMode) {
        match mode {
            OutputMode::Json => self.emit(),
            OutputMode::Text => match self {
                Self::Phase { view, .. } => println!("{}", view),
                Self::Error { message, .. } => eprintln!("error: {}", message),
                Self::Log { message, .. } => println!("  {}", message),
                _ => {}
            },
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Translate an engine event; `view` is the rendered displayed phase
    pub fn from_engine(event: &EngineEvent, view: impl FnOnce() -> String) -> Option<Self> {
        let timestamp = Self::now();
        let event = match event {
            EngineEvent::PhaseChanged { new, .. } => Self::Phase {
                phase: new.name().to_string(),
                document: new.document().map(|d| d.to_string()),
                view: view(),
                timestamp,
            },
            EngineEvent::SessionCreated {
                document,
                session_id,
            } => Self::SessionCreated {
                document: document.to_string(),
                session_id: *session_id,
                timestamp,
            },
            EngineEvent::SessionRemoved {
                document,
                session_id,
            } => Self::SessionRemoved {
                document: document.to_string(),
                session_id: *session_id,
                timestamp,
            },
            EngineEvent::Reset { generation } => Self::Reset {
                generation: *generation,
                timestamp,
            },
            EngineEvent::ConfigurationSaved {
                document,
                configuration,
            } => Self::ConfigurationSaved {
                document: document.to_string(),
                configuration: configuration.clone(),
                timestamp,
            },
            EngineEvent::LogLine { document, line } => Self::Log {
                document: document.to_string(),
                message: line.clone(),
                timestamp,
            },
            EngineEvent::Fault { document, error } => Self::Error {
                message: error.clone(),
                document: Some(document.to_string()),
                fatal: false,
                timestamp,
            },
            EngineEvent::Shutdown => return None,
        };
        Some(event)
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    /// An outbound action envelope as seen by the backend
    pub fn sent(document: &str, envelope: &Value) -> Self {
        Self::Sent {
            document: document.to_string(),
            action: envelope
                .get("action")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            data: envelope.get("action-data").cloned(),
            timestamp: Self::now(),
        }
    }

    pub fn error(message: String, fatal: bool) -> Self {
        Self::Error {
            message,
            document: None,
            fatal,
            timestamp: Self::now(),
        }
    }

    /// Report a failure on the command input; I/O failures end the input
    pub fn input_error(error: &Error) -> Self {
        let message = match error {
            Error::Io(e) => format!("stdin failed: {}", e),
            other => format!("invalid command: {}", other),
        };
        Self::error(message, error.is_fatal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sparkconn_app::DisplayedPhase;
    use sparkconn_core::{DocumentId, SparkOption};

    #[test]
    fn test_phase_serialization() {
        let event = HeadlessEvent::from_engine(
            &EngineEvent::PhaseChanged {
                old: DisplayedPhase::Loading,
                new: DisplayedPhase::Configuring(DocumentId::new("nb1")),
            },
            || "Configure Spark".to_string(),
        )
        .unwrap();
        let value: Value = serde_json::to_value(&event).expect("serialization failed");

        assert_eq!(value["event"], "phase");
        assert_eq!(value["phase"], "configuring");
        assert_eq!(value["document"], "nb1");
        assert_eq!(value["view"], "Configure Spark");
        assert!(value["timestamp"].is_number());
    }

    #[test]
    fn test_sent_serialization() {
        let envelope = json!({
            "type": "action",
            "action": "connect",
            "action-data": {"bundled_options": ["spark3"], "list_of_options": []},
        });
        let value = serde_json::to_value(HeadlessEvent::sent("nb1", &envelope)).unwrap();

        assert_eq!(value["event"], "sent");
        assert_eq!(value["action"], "connect");
        assert_eq!(value["data"]["bundled_options"][0], "spark3");
    }

    #[test]
    fn test_sent_without_action_data() {
        let value = serde_json::to_value(HeadlessEvent::sent(
            "nb1",
            &json!({"type": "action", "action": "open"}),
        ))
        .unwrap();

        assert_eq!(value["action"], "open");
        assert!(value["data"].is_null());
    }

    #[test]
    fn test_configuration_saved_serialization() {
        let event = HeadlessEvent::from_engine(
            &EngineEvent::ConfigurationSaved {
                document: DocumentId::new("nb1"),
                configuration: SavedConfiguration {
                    bundled_options: vec![],
                    list_of_options: vec![SparkOption::new("spark.driver.memory", "2g")],
                },
            },
            String::new,
        )
        .unwrap();
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["event"], "configuration_saved");
        assert_eq!(
            value["configuration"]["list_of_options"][0]["name"],
            "spark.driver.memory"
        );
    }

    #[test]
    fn test_fault_becomes_non_fatal_error() {
        let event = HeadlessEvent::from_engine(
            &EngineEvent::Fault {
                document: DocumentId::new("nb1"),
                error: "Unrecognized message type: mystery".to_string(),
            },
            String::new,
        )
        .unwrap();
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["event"], "error");
        assert_eq!(value["fatal"], false);
        assert_eq!(value["document"], "nb1");
    }

    #[test]
    fn test_invalid_command_is_not_fatal() {
        let event = HeadlessEvent::input_error(&Error::protocol("unknown command: frobnicate"));
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["fatal"], false);
        assert!(value["message"]
            .as_str()
            .unwrap()
            .starts_with("invalid command:"));
    }

    #[test]
    fn test_stdin_failure_is_fatal() {
        let io = std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "stream did not contain valid UTF-8",
        );
        let event = HeadlessEvent::input_error(&Error::Io(io));
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["fatal"], true);
        assert!(value["message"].as_str().unwrap().starts_with("stdin failed:"));
    }

    #[test]
    fn test_shutdown_is_not_reported() {
        assert!(HeadlessEvent::from_engine(&EngineEvent::Shutdown, String::new).is_none());
    }
}
