//! Stdin command parsing for the headless runner
//!
//! Each line is one JSON object naming a host or backend event, e.g.
//! `{"focus": "nb1"}` or `{"status": {"document": "nb1", "value": "connected"}}`.
//! The bare words `q` and `quit` are accepted as shorthands for quitting.

use serde::Deserialize;
use serde_json::Value;

use sparkconn_app::Message;
use sparkconn_core::prelude::*;
use sparkconn_core::{BackendStatus, ConnectionStatus, DocumentId};

/// One line of stdin input
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum HostCommand {
    /// Focus a document, or `null` to unfocus
    Focus(Option<DocumentId>),
    /// The document's backend session became ready
    Ready(DocumentId),
    /// The host closed the document
    Close(DocumentId),
    /// Transport connection status changed
    Status {
        document: DocumentId,
        value: ConnectionStatus,
    },
    /// The backend process reported its own status
    Kernel {
        document: DocumentId,
        value: BackendStatus,
    },
    /// The backend sends a message on the document's channel
    Backend { document: DocumentId, message: Value },
    /// The backend closes the document's channel
    BackendClose(DocumentId),
    /// Submit the Configuring form
    Connect { document: DocumentId },
    /// Reconfigure from Connected or ConnectFailed
    Reconfigure { document: DocumentId },
    AddOption {
        document: DocumentId,
        name: String,
        #[serde(default)]
        value: String,
    },
    RemoveOption { document: DocumentId, name: String },
    ToggleBundle { document: DocumentId, bundle: String },
    Quit(bool),
}

/// Where a command is delivered
#[derive(Debug)]
pub enum Route {
    /// Straight into the coordinator
    Engine(Message),
    /// To the simulated backend of a document
    Backend(DocumentId, BackendCommand),
    /// Nothing to do
    Ignore,
}

/// What the simulated backend should do on its channel
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    Reply(Value),
    Close,
}

/// Parse one stdin line. Empty lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<HostCommand>> {
    let trimmed = line.trim();
    match trimmed {
        "" => Ok(None),
        "q" | "quit" => Ok(Some(HostCommand::Quit(true))),
        _ => Ok(Some(serde_json::from_str(trimmed)?)),
    }
}

impl HostCommand {
    /// Decide where this command goes
    pub fn route(self) -> Route {
        let message = match self {
            HostCommand::Focus(document) => Message::FocusChanged { document },
            HostCommand::Ready(document) => Message::DocumentReady { document },
            HostCommand::Close(document) => Message::DocumentClosed { document },
            HostCommand::Status { document, value } => Message::ConnectionStatusChanged {
                document,
                status: value,
            },
            HostCommand::Kernel { document, value } => Message::BackendStatusChanged {
                document,
                status: value,
            },
            HostCommand::Backend { document, message } => {
                return Route::Backend(document, BackendCommand::Reply(message))
            }
            HostCommand::BackendClose(document) => {
                return Route::Backend(document, BackendCommand::Close)
            }
            HostCommand::Connect { document } => Message::ConnectRequested { document },
            HostCommand::Reconfigure { document } => Message::ReconfigureRequested { document },
            HostCommand::AddOption {
                document,
                name,
                value,
            } => Message::AddOption {
                document,
                name,
                value,
            },
            HostCommand::RemoveOption { document, name } => {
                Message::RemoveOption { document, name }
            }
            HostCommand::ToggleBundle { document, bundle } => {
                Message::ToggleBundle { document, bundle }
            }
            HostCommand::Quit(true) => Message::Quit,
            HostCommand::Quit(false) => return Route::Ignore,
        };
        Route::Engine(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(line: &str) -> HostCommand {
        parse_command(line).unwrap().unwrap()
    }

    #[test]
    fn test_focus_and_unfocus() {
        assert_eq!(
            parse(r#"{"focus": "nb1"}"#),
            HostCommand::Focus(Some(DocumentId::new("nb1")))
        );
        assert_eq!(parse(r#"{"focus": null}"#), HostCommand::Focus(None));
    }

    #[test]
    fn test_status_values_parse() {
        assert_eq!(
            parse(r#"{"status": {"document": "nb1", "value": "connected"}}"#),
            HostCommand::Status {
                document: DocumentId::new("nb1"),
                value: ConnectionStatus::Connected,
            }
        );
        assert_eq!(
            parse(r#"{"kernel": {"document": "nb1", "value": "restarting"}}"#),
            HostCommand::Kernel {
                document: DocumentId::new("nb1"),
                value: BackendStatus::Restarting,
            }
        );
    }

    #[test]
    fn test_backend_message_routes_to_backend() {
        let command = parse(r#"{"backend": {"document": "nb1", "message": {"msgtype": "follow-log", "msg": "hi"}}}"#);
        match command.route() {
            Route::Backend(document, BackendCommand::Reply(message)) => {
                assert_eq!(document, DocumentId::new("nb1"));
                assert_eq!(message, json!({"msgtype": "follow-log", "msg": "hi"}));
            }
            other => panic!("Expected backend route, got {:?}", other),
        }
    }

    #[test]
    fn test_user_actions_route_to_engine() {
        assert!(matches!(
            parse(r#"{"connect": {"document": "nb1"}}"#).route(),
            Route::Engine(Message::ConnectRequested { .. })
        ));
        assert!(matches!(
            parse(r#"{"add_option": {"document": "nb1", "name": "spark.driver.memory", "value": "2g"}}"#).route(),
            Route::Engine(Message::AddOption { ref value, .. }) if value == "2g"
        ));
    }

    #[test]
    fn test_quit_shorthands() {
        assert_eq!(parse("q"), HostCommand::Quit(true));
        assert_eq!(parse(r#"{"quit": true}"#), HostCommand::Quit(true));
        assert!(matches!(HostCommand::Quit(false).route(), Route::Ignore));
    }

    #[test]
    fn test_empty_and_invalid_lines() {
        assert!(parse_command("   ").unwrap().is_none());
        assert!(parse_command(r#"{"teleport": "nb1"}"#).is_err());
        assert!(parse_command("not json").is_err());
    }
}
