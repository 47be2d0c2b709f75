//! User actions fired from the phase objects

use sparkconn_comm::CommAction;
use sparkconn_core::prelude::*;
use sparkconn_core::DocumentId;

use crate::host::store_saved_configuration;
use crate::phases::{ConfiguringPhase, DisplayedPhase};
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

/// Submit the Configuring form: show Connecting, persist, send `connect`
pub fn handle_connect(state: &mut AppState, document: &DocumentId) -> UpdateResult {
    if !state.focus_allowed(document)
        || state.displayed != DisplayedPhase::Configuring(document.clone())
    {
        debug!("Connect for {} ignored while {}", document, state.displayed);
        return UpdateResult::none();
    }

    let Some(handle) = state.registry.get_mut(document) else {
        return UpdateResult::none();
    };
    let phases = &mut handle.session.phases;
    let selection = phases.configuring.selection().clone();
    let Some(config) = phases.configuring.connect.fire(selection) else {
        debug!("Connect for {} already handled", document);
        return UpdateResult::none();
    };
    phases.connecting.init(config.clone());
    let sender = handle.sender();

    state.display(DisplayedPhase::Connecting(document.clone()));

    let key = state.settings.metadata.key.clone();
    match store_saved_configuration(state.metadata.as_ref(), document, &key, &config) {
        Ok(()) => state.record_saved(document, config.clone()),
        Err(e) => {
            warn!("Could not save configuration for {}: {}", document, e);
            state.record_fault(document, e.to_string());
        }
    }

    UpdateResult::action(UpdateAction::SendAction {
        document: document.clone(),
        sender,
        action: CommAction::Connect(config),
    })
}

/// Reconfigure from Connected or ConnectFailed: show Loading, disconnect, restart
pub fn handle_reconfigure(state: &mut AppState, document: &DocumentId) -> UpdateResult {
    let displayed = state.displayed.clone();
    let Some(handle) = state.registry.get_mut(document) else {
        return UpdateResult::none();
    };
    let phases = &mut handle.session.phases;

    let fired = match displayed {
        DisplayedPhase::Connected(ref d) if d == document => {
            phases.connected.reconfigure.fire(()).is_some()
        }
        DisplayedPhase::ConnectFailed(ref d) if d == document => {
            phases.connect_failed.reconfigure.fire(()).is_some()
        }
        _ => false,
    };
    if !fired {
        debug!("Reconfigure for {} ignored while {}", document, displayed);
        return UpdateResult::none();
    }
    let sender = handle.sender();

    info!("Reconfiguring {}: disconnecting and restarting backend", document);
    state.display(DisplayedPhase::Loading);

    UpdateResult::action(UpdateAction::DisconnectAndRestart {
        document: document.clone(),
        sender,
    })
}

// ─────────────────────────────────────────────────────────
// Configuring Form Edits
// ─────────────────────────────────────────────────────────

/// The Configuring form of `document`, if it is on screen
fn configuring_mut<'a>(
    state: &'a mut AppState,
    document: &DocumentId,
) -> Option<&'a mut ConfiguringPhase> {
    if state.displayed != DisplayedPhase::Configuring(document.clone()) {
        debug!("Form edit for {} ignored while {}", document, state.displayed);
        return None;
    }
    state
        .registry
        .get_mut(document)
        .map(|h| &mut h.session.phases.configuring)
}

pub fn handle_add_option(
    state: &mut AppState,
    document: &DocumentId,
    name: String,
    value: String,
) -> UpdateResult {
    if let Some(form) = configuring_mut(state, document) {
        debug!("{}: set {} = {}", document, name, value);
        form.add_option(name, value);
    }
    UpdateResult::none()
}

pub fn handle_remove_option(
    state: &mut AppState,
    document: &DocumentId,
    name: &str,
) -> UpdateResult {
    if let Some(form) = configuring_mut(state, document) {
        if !form.remove_option(name) {
            debug!("{}: option {} was not set", document, name);
        }
    }
    UpdateResult::none()
}

pub fn handle_toggle_bundle(
    state: &mut AppState,
    document: &DocumentId,
    bundle: &str,
) -> UpdateResult {
    if let Some(form) = configuring_mut(state, document) {
        match form.toggle_bundle(bundle) {
            Some(selected) => debug!("{}: bundle {} selected={}", document, bundle, selected),
            None => warn!("{}: bundle {} is not offered", document, bundle),
        }
    }
    UpdateResult::none()
}
