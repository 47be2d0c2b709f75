//! Comm transport abstraction and the in-process loopback implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use sparkconn_core::prelude::*;
use sparkconn_core::{ChannelEvent, DocumentId};

use crate::channel::{ChannelId, CommChannel};
use crate::commands::{CommAction, CommSender};

/// Buffer size of each direction of a loopback channel
const LOOPBACK_BUFFER: usize = 64;

/// Opens comm channels to a document's backend.
///
/// `open_channel` resolves once the backend acknowledged the channel. The
/// handshake action is the first message sent on it.
#[trait_variant::make(CommTransport: Send)]
pub trait LocalCommTransport {
    async fn open_channel(
        &self,
        document: &DocumentId,
        target: &str,
        handshake: CommAction,
    ) -> Result<CommChannel>;
}

// ─────────────────────────────────────────────────────────
// Loopback Transport
// ─────────────────────────────────────────────────────────

/// In-process transport whose backend side is driven by the caller.
///
/// Every accepted open is handed out as a [`BackendPeer`] on the receiver
/// returned from [`LoopbackTransport::new`].
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    peers_tx: mpsc::UnboundedSender<BackendPeer>,
    refuse: Arc<AtomicBool>,
}

impl LoopbackTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BackendPeer>) {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        (
            Self {
                peers_tx,
                refuse: Arc::new(AtomicBool::new(false)),
            },
            peers_rx,
        )
    }

    /// While set, every open fails with [`Error::ChannelOpen`]
    pub fn refuse_opens(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

impl CommTransport for LoopbackTransport {
    async fn open_channel(
        &self,
        document: &DocumentId,
        target: &str,
        handshake: CommAction,
    ) -> Result<CommChannel> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(Error::channel_open(format!(
                "backend for {} refused target '{}'",
                document, target
            )));
        }

        let (outbound_tx, outbound_rx) = mpsc::channel(LOOPBACK_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(LOOPBACK_BUFFER);
        let channel = CommChannel::new(document.clone(), outbound_tx, inbound_rx);

        let peer = BackendPeer {
            document: document.clone(),
            target: target.to_string(),
            channel_id: channel.id(),
            frontend: channel.handle.sender(),
            outbound_rx,
            inbound_tx: Some(inbound_tx),
        };
        self.peers_tx
            .send(peer)
            .map_err(|_| Error::transport("loopback backend is gone"))?;

        channel.handle.send(&handshake).await?;

        debug!(
            "Loopback channel #{} opened for {} ({})",
            channel.id(),
            document,
            target
        );
        Ok(channel)
    }
}

/// Backend side of one loopback channel
pub struct BackendPeer {
    document: DocumentId,
    target: String,
    channel_id: ChannelId,
    /// Observes the frontend's closed flag
    frontend: CommSender,
    outbound_rx: mpsc::Receiver<Value>,
    inbound_tx: Option<mpsc::Sender<ChannelEvent>>,
}

impl std::fmt::Debug for BackendPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendPeer")
            .field("document", &self.document)
            .field("target", &self.target)
            .field("channel_id", &self.channel_id)
            .finish()
    }
}

impl BackendPeer {
    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Deliver a message to the frontend
    pub async fn reply(&self, message: Value) -> Result<()> {
        let tx = self.inbound_tx.as_ref().ok_or(Error::ChannelClosed)?;
        tx.send(ChannelEvent::Message(message))
            .await
            .map_err(|_| Error::channel_send(format!("loopback channel #{}", self.channel_id)))
    }

    /// Next action sent by the frontend, `None` once it closed the channel
    pub async fn recv(&mut self) -> Option<Value> {
        self.outbound_rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Value> {
        self.outbound_rx.try_recv().ok()
    }

    /// Close from the backend side
    pub async fn close(&mut self) {
        if let Some(tx) = self.inbound_tx.take() {
            let _ = tx.send(ChannelEvent::Closed).await;
        }
    }

    /// True once either side closed the channel
    pub fn is_closed(&self) -> bool {
        self.inbound_tx.is_none() || self.frontend.is_closed()
    }
}
