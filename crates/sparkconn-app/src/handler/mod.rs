//! Handler module - TEA update function and event handlers
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `focus`: Focus, readiness, connection status and reset handling
//! - `channel`: Channel lifecycle and backend message dispatch
//! - `user`: User actions fired from the phase objects

pub(crate) mod channel;
pub(crate) mod focus;
pub(crate) mod update;
pub(crate) mod user;


use sparkconn_comm::{CommAction, CommSender};
use sparkconn_core::DocumentId;

use crate::message::Message;
use crate::session_registry::OpenTicket;

// Re-export main entry point
pub use update::update;

/// Actions that the event loop should perform after update
#[derive(Debug, Clone)]
pub enum UpdateAction {
    /// Open a comm channel for a document with the `open` handshake
    OpenChannel {
        document: DocumentId,
        ticket: OpenTicket,
    },

    /// Send an action on a session's channel
    SendAction {
        document: DocumentId,
        sender: CommSender,
        action: CommAction,
    },

    /// Ask the host to reconnect the document's backend
    RequestReconnect {
        document: DocumentId,
        generation: u64,
        /// Reset the coordinator once the reconnect completes
        reset: bool,
    },

    /// Send `disconnect` (best-effort), then ask the host to restart the backend
    DisconnectAndRestart {
        document: DocumentId,
        sender: CommSender,
    },
}

impl UpdateAction {
    pub fn document(&self) -> &DocumentId {
        match self {
            Self::OpenChannel { document, .. }
            | Self::SendAction { document, .. }
            | Self::RequestReconnect { document, .. }
            | Self::DisconnectAndRestart { document, .. } => document,
        }
    }
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Optional follow-up message to process
    pub message: Option<Message>,
    /// Optional action for the event loop to perform
    pub action: Option<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            action: None,
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            action: Some(action),
        }
    }

    pub(crate) fn maybe_action(action: Option<UpdateAction>) -> Self {
        Self {
            message: None,
            action,
        }
    }
}
