//! Host event handlers: focus, readiness, connection status and reset

use sparkconn_comm::CommAction;
use sparkconn_core::prelude::*;
use sparkconn_core::{BackendStatus, ConnectionStatus, DocumentId};

use crate::message::Message;
use crate::phases::DisplayedPhase;
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

/// Handle a focus change
pub fn handle_focus_changed(state: &mut AppState, document: Option<DocumentId>) -> UpdateResult {
    match document {
        None => {
            info!("No document focused");
            state.focused = None;
            state.display(DisplayedPhase::NotAttached);
            UpdateResult::none()
        }
        Some(document) => {
            info!("Focused {}", document);
            state.ensure_document(&document);
            state.focused = Some(document.clone());
            UpdateResult::maybe_action(attach(state, &document))
        }
    }
}

/// Show Loading for the focused document, watch its connection status and,
/// if its backend session is already ready, resume it.
pub(crate) fn attach(state: &mut AppState, document: &DocumentId) -> Option<UpdateAction> {
    state.display(DisplayedPhase::Loading);

    if state.subscribe_status(document) {
        debug!("Watching connection status of {}", document);
    }

    if state.is_ready(document) {
        resume(state, document)
    } else {
        None
    }
}

/// Re-issue the handshake on an existing session, or ask for a reconnect if
/// the transport is already up without one.
fn resume(state: &AppState, document: &DocumentId) -> Option<UpdateAction> {
    if let Some(handle) = state.registry.get(document) {
        debug!("Re-issuing open handshake for {}", document);
        return Some(UpdateAction::SendAction {
            document: document.clone(),
            sender: handle.sender(),
            action: CommAction::Open,
        });
    }

    if state.registry.has_pending(document) {
        trace!("Channel open already in flight for {}", document);
        return None;
    }

    if state.status(document).is_some_and(ConnectionStatus::is_connected) {
        debug!("Backend of {} already connected, requesting reconnect", document);
        return Some(UpdateAction::RequestReconnect {
            document: document.clone(),
            generation: state.registry.generation(),
            reset: false,
        });
    }

    None
}

/// Handle the one-shot session-ready signal
pub fn handle_document_ready(state: &mut AppState, document: &DocumentId) -> UpdateResult {
    state.mark_ready(document);

    if !state.focus_allowed(document) {
        debug!("{} ready while not focused", document);
        return UpdateResult::none();
    }

    UpdateResult::maybe_action(resume(state, document))
}

/// Handle the host closing a document
pub fn handle_document_closed(state: &mut AppState, document: &DocumentId) -> UpdateResult {
    info!("Document {} closed", document);
    state.registry.close(document);
    state.forget_document(document);

    if state.focus_allowed(document) {
        UpdateResult::message(Message::FocusChanged { document: None })
    } else {
        UpdateResult::none()
    }
}

/// Handle a transport connection status change
pub fn handle_connection_status(
    state: &mut AppState,
    document: &DocumentId,
    status: ConnectionStatus,
) -> UpdateResult {
    state.set_status(document, status.clone());

    if !state.is_status_subscribed(document) {
        trace!(
            "Status '{}' for {} ignored (not subscribed)",
            status.as_str(),
            document
        );
        return UpdateResult::none();
    }

    debug!("Connection status of {}: {}", document, status.as_str());
    let focused = state.focus_allowed(document);

    match status {
        ConnectionStatus::Connected => {
            if state.registry.has(document) || state.registry.has_pending(document) {
                warn!("Replacing existing session for {} on reconnect", document);
                state.registry.close(document);
            }
            if focused {
                state.display(DisplayedPhase::Loading);
            }

            match state.registry.begin_create(document) {
                Ok(ticket) => UpdateResult::action(UpdateAction::OpenChannel {
                    document: document.clone(),
                    ticket,
                }),
                Err(e) => {
                    if e.is_fatal() {
                        error!("Cannot create session for {}: {}", document, e);
                    } else {
                        warn!("Cannot create session for {}: {}", document, e);
                    }
                    state.record_fault(document, e.to_string());
                    UpdateResult::none()
                }
            }
        }
        ConnectionStatus::Connecting => {
            if focused {
                state.display(DisplayedPhase::Loading);
            }
            state.registry.close(document);
            UpdateResult::none()
        }
        ConnectionStatus::Other(_) => {
            if focused {
                state.display(DisplayedPhase::NotAttached);
            }
            UpdateResult::none()
        }
    }
}

/// Handle a status reported by the backend process itself
pub fn handle_backend_status(
    state: &mut AppState,
    document: &DocumentId,
    status: BackendStatus,
) -> UpdateResult {
    let watching = state
        .registry
        .get(document)
        .is_some_and(|h| h.session.watching_backend);
    if !watching {
        trace!("Backend status '{}' for {} ignored", status.as_str(), document);
        return UpdateResult::none();
    }

    if status != BackendStatus::Restarting {
        trace!("Backend of {} is {}", document, status.as_str());
        return UpdateResult::none();
    }

    info!("Backend of {} restarting, reconnecting before reset", document);
    if state.focus_allowed(document) {
        state.display(DisplayedPhase::Loading);
    }

    UpdateResult::action(UpdateAction::RequestReconnect {
        document: document.clone(),
        generation: state.registry.generation(),
        reset: true,
    })
}

/// Handle completion of a reconnect request
pub fn handle_reconnect_completed(
    state: &mut AppState,
    document: &DocumentId,
    generation: u64,
    reset: bool,
) -> UpdateResult {
    if !reset {
        debug!("Reconnect for {} completed", document);
        return UpdateResult::none();
    }

    if generation != state.registry.generation() {
        debug!(
            "Ignoring reset from generation {} (now {})",
            generation,
            state.registry.generation()
        );
        return UpdateResult::none();
    }

    UpdateResult::maybe_action(reset_coordinator(state))
}

/// Discard every session and subscription, then attach the focused document again
pub(crate) fn reset_coordinator(state: &mut AppState) -> Option<UpdateAction> {
    let next = state.registry.next_generation();
    let mut previous = std::mem::replace(&mut state.registry, next);
    previous.clear();
    state.clear_status_subscriptions();

    info!(
        "Coordinator reset (generation {})",
        state.registry.generation()
    );

    match state.focused.clone() {
        Some(document) => attach(state, &document),
        None => {
            state.display(DisplayedPhase::NotAttached);
            None
        }
    }
}
