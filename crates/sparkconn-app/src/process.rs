//! Message processing
//!
//! Runs a message through the TEA update function, follows up on chained
//! messages and dispatches every resulting action.

use std::sync::Arc;

use tokio::sync::mpsc;

use sparkconn_comm::CommTransport;

use crate::actions::handle_action;
use crate::handler;
use crate::host::DocumentHost;
use crate::message::Message;
use crate::state::AppState;

/// Process a message through the TEA update function
pub fn process_message<T, H>(
    state: &mut AppState,
    message: Message,
    msg_tx: &mpsc::Sender<Message>,
    transport: &Arc<T>,
    host: &Arc<H>,
) where
    T: CommTransport + Sync + 'static,
    H: DocumentHost + Sync + 'static,
{
    let mut msg = Some(message);
    while let Some(m) = msg {
        let result = handler::update(state, m);

        if let Some(action) = result.action {
            tracing::trace!("Dispatching action for {}", action.document());
            handle_action(
                action,
                msg_tx.clone(),
                transport.clone(),
                host.clone(),
                &state.settings.comm,
            );
        }

        msg = result.message;
    }
}
