//! Channel handle - one open comm channel to a document's backend

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};

use sparkconn_core::prelude::*;
use sparkconn_core::{ChannelEvent, DocumentId};

use crate::commands::{CommAction, CommSender, QueuedAction};

/// Unique identifier for an opened channel
pub type ChannelId = u64;

static CHANNEL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique channel ID
pub fn next_channel_id() -> ChannelId {
    CHANNEL_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Owner's handle to one open comm channel.
///
/// Not `Clone`: a session owns its channel exclusively. Background tasks that
/// only need to send get a [`CommSender`] via [`ChannelHandle::sender`].
pub struct ChannelHandle {
    id: ChannelId,
    document: DocumentId,
    sender: CommSender,
    closed: Arc<AtomicBool>,
    /// Sending `true` stops the inbound forwarding task for this channel.
    shutdown_tx: watch::Sender<bool>,
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("id", &self.id)
            .field("document", &self.document)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ChannelHandle {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    /// Cloneable sender for background send tasks
    pub fn sender(&self) -> CommSender {
        self.sender.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send an action on this channel
    pub async fn send(&self, action: &CommAction) -> Result<()> {
        self.sender.send(action).await
    }

    /// Record that the remote end went away
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Close locally without sending a teardown message.
    ///
    /// Stops inbound forwarding; later sends through any cloned sender fail
    /// with [`Error::ChannelClosed`].
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Closing channel #{} for {}", self.id, self.document);
        }
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// A freshly opened channel: the owner's handle plus its inbound event stream
pub struct CommChannel {
    pub handle: ChannelHandle,
    /// Messages and the close notification from the backend
    pub events: mpsc::Receiver<ChannelEvent>,
    /// Flips to `true` when the handle is closed or dropped
    pub shutdown_rx: watch::Receiver<bool>,
    /// Actions submitted through [`CommSender::submit`], for [`write_queued`]
    pub queued: mpsc::UnboundedReceiver<QueuedAction>,
}

impl std::fmt::Debug for CommChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommChannel")
            .field("handle", &self.handle)
            .finish()
    }
}

impl CommChannel {
    /// Wire up a channel from its transport halves
    pub fn new(
        document: DocumentId,
        outbound_tx: mpsc::Sender<Value>,
        events: mpsc::Receiver<ChannelEvent>,
    ) -> Self {
        let id = next_channel_id();
        let closed = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (queue_tx, queued) = mpsc::unbounded_channel();
        let sender = CommSender::new(id, outbound_tx, queue_tx, closed.clone());

        Self {
            handle: ChannelHandle {
                id,
                document,
                sender,
                closed,
                shutdown_tx,
            },
            events,
            shutdown_rx,
            queued,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.handle.id
    }
}

/// Deliver submitted actions one at a time, in submission order, until the
/// channel shuts down. Actions still queued at shutdown are dropped.
pub async fn write_queued(
    sender: CommSender,
    mut queued: mpsc::UnboundedReceiver<QueuedAction>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            item = queued.recv() => {
                let Some(QueuedAction { action, done }) = item else {
                    break;
                };
                let _ = done.send(sender.send(&action).await);
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
    trace!("Writer for channel #{} stopped", sender.channel_id());
}
