//! Channel lifecycle and backend message dispatch

use serde_json::Value;

use sparkconn_comm::{parse_comm_message, ChannelHandle, ChannelId};
use sparkconn_core::prelude::*;
use sparkconn_core::{
    CommMessage, ConnectError, ConnectedInfo, DocumentId, FollowLog, OpenPage, OpenRequest,
};

use crate::host::load_saved_configuration;
use crate::phases::DisplayedPhase;
use crate::session::Session;
use crate::session_registry::OpenTicket;
use crate::state::AppState;

use super::UpdateResult;

// ─────────────────────────────────────────────────────────
// Channel Lifecycle
// ─────────────────────────────────────────────────────────

/// Register the session for an acknowledged channel
pub fn handle_channel_opened(
    state: &mut AppState,
    document: DocumentId,
    ticket: OpenTicket,
    channel: ChannelHandle,
) -> UpdateResult {
    if !state.registry.is_pending(&document, ticket) {
        warn!(
            "Closing late channel #{} for {} (ticket #{} superseded)",
            channel.id(),
            document,
            ticket
        );
        channel.close();
        return UpdateResult::none();
    }

    let doc = state.ensure_document(&document);
    let session = Session::new(&doc, state.settings.logs.max_lines);
    if let Err(channel) = state.registry.register(ticket, session, channel) {
        channel.close();
    }
    UpdateResult::none()
}

pub fn handle_channel_open_failed(
    state: &mut AppState,
    document: &DocumentId,
    ticket: OpenTicket,
    error: &str,
) -> UpdateResult {
    if state.registry.abandon_open(document, ticket) {
        warn!("Channel open for {} failed: {}", document, error);
        state.record_fault(document, error);
    } else {
        debug!("Ignoring failure of superseded open #{} for {}", ticket, document);
    }
    UpdateResult::none()
}

/// The backend closed the channel
pub fn handle_channel_closed(
    state: &mut AppState,
    document: &DocumentId,
    channel_id: ChannelId,
) -> UpdateResult {
    match state.registry.get(document) {
        Some(handle) if handle.channel_id() == channel_id => handle.mark_closed(),
        _ => {
            debug!("Close of stale channel #{} for {}", channel_id, document);
            return UpdateResult::none();
        }
    }

    info!("Channel #{} for {} closed by backend", channel_id, document);
    state.registry.close(document);

    if state.displayed.is_scoped_to(document) {
        state.display(DisplayedPhase::Loading);
    }
    UpdateResult::none()
}

// ─────────────────────────────────────────────────────────
// Message Dispatch
// ─────────────────────────────────────────────────────────

/// Filter and dispatch one raw backend message
pub fn handle_channel_message(
    state: &mut AppState,
    document: &DocumentId,
    channel_id: ChannelId,
    value: Value,
) -> UpdateResult {
    if !state.focus_allowed(document) {
        trace!("Dropping message for unfocused {}", document);
        return UpdateResult::none();
    }

    match state.registry.get(document) {
        Some(handle) if handle.channel_id() == channel_id => {}
        _ => {
            debug!("Dropping message from stale channel #{}", channel_id);
            return UpdateResult::none();
        }
    }

    let message = match parse_comm_message(value) {
        Ok(message) => message,
        Err(e) => {
            warn!("Protocol fault from {}: {}", document, e);
            state.record_fault(document, e.to_string());
            return UpdateResult::none();
        }
    };

    trace!("{}: {}", document, message.summary());
    dispatch(state, document, message);
    UpdateResult::none()
}

fn dispatch(state: &mut AppState, document: &DocumentId, message: CommMessage) {
    match message {
        CommMessage::Open(open) => match open.page {
            OpenPage::Config => handle_open_config(state, document, &open),
            ref page => debug!("Ignoring open page '{}' for {}", page.as_str(), document),
        },
        CommMessage::Connected(info) => handle_connected(state, document, &info),
        CommMessage::ConnectError(failure) => handle_connect_error(state, document, failure),
        CommMessage::FollowLog(line) => handle_follow_log(state, document, line),
        CommMessage::Unknown { msgtype, .. } => {
            let err = Error::unknown_message_type(msgtype);
            warn!("{} (from {})", err, document);
            state.record_fault(document, err.to_string());
        }
    }
}

fn handle_open_config(state: &mut AppState, document: &DocumentId, open: &OpenRequest) {
    let saved = load_saved_configuration(
        state.metadata.as_ref(),
        document,
        &state.settings.metadata.key,
    );

    let Some(handle) = state.registry.get_mut(document) else {
        return;
    };
    let session_id = handle.session.id;
    let configuring = &mut handle.session.phases.configuring;
    configuring.init(open, saved);
    if configuring.connect.subscribe() {
        debug!("Session #{}: subscribed to connect", session_id);
    }

    state.display(DisplayedPhase::Configuring(document.clone()));
}

fn handle_connected(state: &mut AppState, document: &DocumentId, info: &ConnectedInfo) {
    let Some(handle) = state.registry.get_mut(document) else {
        return;
    };
    let session = &mut handle.session;
    session.phases.connected.init(info);
    if session.watch_backend() {
        debug!("Session #{}: watching backend status", session.id);
    }
    if session.phases.connected.reconfigure.subscribe() {
        debug!("Session #{}: subscribed to reconfigure (connected)", session.id);
    }

    info!("{} connected to Spark", document);
    state.display(DisplayedPhase::Connected(document.clone()));
}

fn handle_connect_error(state: &mut AppState, document: &DocumentId, failure: ConnectError) {
    let Some(handle) = state.registry.get_mut(document) else {
        return;
    };
    let session = &mut handle.session;
    let error = Error::backend(failure.error.clone());
    session.phases.connect_failed.init(failure.error);
    if session.phases.connect_failed.reconfigure.subscribe() {
        debug!("Session #{}: subscribed to reconfigure (failed)", session.id);
    }

    warn!("{}: {}", document, error);
    state.display(DisplayedPhase::ConnectFailed(document.clone()));
}

fn handle_follow_log(state: &mut AppState, document: &DocumentId, line: FollowLog) {
    let displayed = state.displayed.clone();
    let Some(handle) = state.registry.get_mut(document) else {
        return;
    };
    let phases = &mut handle.session.phases;

    match displayed {
        DisplayedPhase::Connected(ref d) if d == document => {
            phases.connected.log(line.msg.clone())
        }
        DisplayedPhase::Connecting(ref d) if d == document => {
            phases.connecting.log(line.msg.clone())
        }
        _ => {
            trace!("Dropping log line while {}", displayed.name());
            return;
        }
    }
    state.record_log(document, line.msg);
}
