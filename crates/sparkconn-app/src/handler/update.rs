//! Main update function - handles state transitions (TEA pattern)
//!
//! Handler implementations live in:
//! - `focus`: host events (focus, readiness, connection and backend status)
//! - `channel`: channel lifecycle and backend message dispatch
//! - `user`: actions fired from the phase objects

use crate::message::Message;
use crate::state::AppState;
use sparkconn_core::prelude::*;

use super::{channel, focus, user, UpdateResult};

/// Process a message and update state
/// Returns optional follow-up message and/or action
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    match message {
        Message::Quit => {
            state.request_quit();
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Document Host Events
        // ─────────────────────────────────────────────────────────
        Message::FocusChanged { document } => focus::handle_focus_changed(state, document),
        Message::DocumentReady { document } => focus::handle_document_ready(state, &document),
        Message::DocumentClosed { document } => focus::handle_document_closed(state, &document),
        Message::ConnectionStatusChanged { document, status } => {
            focus::handle_connection_status(state, &document, status)
        }
        Message::BackendStatusChanged { document, status } => {
            focus::handle_backend_status(state, &document, status)
        }
        Message::ReconnectCompleted {
            document,
            generation,
            reset,
        } => focus::handle_reconnect_completed(state, &document, generation, reset),
        Message::HostRequestFailed {
            document,
            operation,
            error,
        } => {
            warn!("Host {} for {} failed: {}", operation, document, error);
            state.record_fault(&document, format!("{} failed: {}", operation, error));
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Channel Events
        // ─────────────────────────────────────────────────────────
        Message::ChannelOpened {
            document,
            ticket,
            channel,
        } => channel::handle_channel_opened(state, document, ticket, channel),
        Message::ChannelOpenFailed {
            document,
            ticket,
            error,
        } => channel::handle_channel_open_failed(state, &document, ticket, &error),
        Message::ChannelMessage {
            document,
            channel_id,
            message,
        } => channel::handle_channel_message(state, &document, channel_id, message),
        Message::ChannelClosed {
            document,
            channel_id,
        } => channel::handle_channel_closed(state, &document, channel_id),
        Message::ActionSendFailed {
            document,
            action,
            error,
        } => {
            warn!("Failed to send '{}' for {}: {}", action, document, error);
            state.record_fault(&document, format!("{}: {}", action, error));
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // User Actions
        // ─────────────────────────────────────────────────────────
        Message::ConnectRequested { document } => user::handle_connect(state, &document),
        Message::ReconfigureRequested { document } => user::handle_reconfigure(state, &document),
        Message::AddOption {
            document,
            name,
            value,
        } => user::handle_add_option(state, &document, name, value),
        Message::RemoveOption { document, name } => {
            user::handle_remove_option(state, &document, &name)
        }
        Message::ToggleBundle { document, bundle } => {
            user::handle_toggle_bundle(state, &document, &bundle)
        }
    }
}
