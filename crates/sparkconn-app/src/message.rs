//! Message types for the application (TEA pattern)

use serde_json::Value;

use sparkconn_comm::{ChannelHandle, ChannelId};
use sparkconn_core::{BackendStatus, ConnectionStatus, DocumentId};

use crate::session_registry::OpenTicket;

/// All possible messages/actions in the application.
///
/// Not `Clone`: [`Message::ChannelOpened`] hands over channel ownership.
#[derive(Debug)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Document Host Events
    // ─────────────────────────────────────────────────────────
    /// Focused document changed (`None` = no document focused)
    FocusChanged { document: Option<DocumentId> },

    /// The document's backend session is ready (one-shot per document)
    DocumentReady { document: DocumentId },

    /// The host closed the document
    DocumentClosed { document: DocumentId },

    /// Transport connection status of the document's backend changed
    ConnectionStatusChanged {
        document: DocumentId,
        status: ConnectionStatus,
    },

    /// The backend process reported its own status
    BackendStatusChanged {
        document: DocumentId,
        status: BackendStatus,
    },

    // ─────────────────────────────────────────────────────────
    // Channel Events
    // ─────────────────────────────────────────────────────────
    /// The backend acknowledged a channel open
    ChannelOpened {
        document: DocumentId,
        ticket: OpenTicket,
        channel: ChannelHandle,
    },

    /// A channel open failed or timed out
    ChannelOpenFailed {
        document: DocumentId,
        ticket: OpenTicket,
        error: String,
    },

    /// Raw message received on a channel
    ChannelMessage {
        document: DocumentId,
        channel_id: ChannelId,
        message: Value,
    },

    /// The backend closed a channel
    ChannelClosed {
        document: DocumentId,
        channel_id: ChannelId,
    },

    /// Sending an action failed
    ActionSendFailed {
        document: DocumentId,
        action: &'static str,
        error: String,
    },

    // ─────────────────────────────────────────────────────────
    // User Actions
    // ─────────────────────────────────────────────────────────
    /// Submit the Configuring form
    ConnectRequested { document: DocumentId },

    /// Change parameters from Connected or ConnectFailed
    ReconfigureRequested { document: DocumentId },

    /// Set a Spark option on the Configuring form
    AddOption {
        document: DocumentId,
        name: String,
        value: String,
    },

    /// Remove a Spark option from the Configuring form
    RemoveOption { document: DocumentId, name: String },

    /// Select or deselect a bundle on the Configuring form
    ToggleBundle { document: DocumentId, bundle: String },

    // ─────────────────────────────────────────────────────────
    // Host Request Completions
    // ─────────────────────────────────────────────────────────
    /// A reconnect requested by the coordinator finished
    ReconnectCompleted {
        document: DocumentId,
        /// Registry generation when the reconnect was requested
        generation: u64,
        /// Reset the coordinator once done (backend restart)
        reset: bool,
    },

    /// A reconnect or restart request failed
    HostRequestFailed {
        document: DocumentId,
        operation: &'static str,
        error: String,
    },

    /// Request application quit
    Quit,
}

impl Message {
    /// The document this message concerns, if any
    pub fn document(&self) -> Option<&DocumentId> {
        match self {
            Message::FocusChanged { document } => document.as_ref(),
            Message::DocumentReady { document }
            | Message::DocumentClosed { document }
            | Message::ConnectionStatusChanged { document, .. }
            | Message::BackendStatusChanged { document, .. }
            | Message::ChannelOpened { document, .. }
            | Message::ChannelOpenFailed { document, .. }
            | Message::ChannelMessage { document, .. }
            | Message::ChannelClosed { document, .. }
            | Message::ActionSendFailed { document, .. }
            | Message::ConnectRequested { document }
            | Message::ReconfigureRequested { document }
            | Message::AddOption { document, .. }
            | Message::RemoveOption { document, .. }
            | Message::ToggleBundle { document, .. }
            | Message::ReconnectCompleted { document, .. }
            | Message::HostRequestFailed { document, .. } => Some(document),
            Message::Quit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_of_host_and_user_messages() {
        let nb1 = DocumentId::new("nb1");
        assert_eq!(
            Message::ConnectRequested {
                document: nb1.clone()
            }
            .document(),
            Some(&nb1)
        );
        assert_eq!(Message::FocusChanged { document: None }.document(), None);
        assert_eq!(Message::Quit.document(), None);
    }
}
