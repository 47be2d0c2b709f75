//! Simulated document host and backend for the headless runner
//!
//! The host answers reconnect and restart requests by replaying the status
//! changes a real transport would report. Backend channels come from the
//! loopback transport; each accepted peer runs in its own task, relaying
//! stdin-scripted replies and reporting the actions it receives.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use sparkconn_app::{DocumentHost, Message};
use sparkconn_comm::BackendPeer;
use sparkconn_core::prelude::*;
use sparkconn_core::{BackendStatus, ConnectionStatus, DocumentId};

use super::commands::BackendCommand;

/// Queue depth of scripted commands per backend peer
const PEER_COMMAND_BUFFER: usize = 32;

// ─────────────────────────────────────────────────────────
// Document Host
// ─────────────────────────────────────────────────────────

/// Document host whose backend process exists only as status messages
#[derive(Debug, Clone)]
pub struct SimulatedHost {
    msg_tx: mpsc::Sender<Message>,
}

impl SimulatedHost {
    pub fn new(msg_tx: mpsc::Sender<Message>) -> Self {
        Self { msg_tx }
    }

    async fn post(&self, message: Message) -> Result<()> {
        self.msg_tx
            .send(message)
            .await
            .map_err(|_| Error::transport("coordinator is gone"))
    }

    async fn cycle_status(&self, document: &DocumentId) -> Result<()> {
        for status in [ConnectionStatus::Connecting, ConnectionStatus::Connected] {
            self.post(Message::ConnectionStatusChanged {
                document: document.clone(),
                status,
            })
            .await?;
        }
        Ok(())
    }
}

impl DocumentHost for SimulatedHost {
    async fn request_reconnect(&self, document: &DocumentId) -> Result<()> {
        info!("Simulated reconnect of {}", document);
        self.cycle_status(document).await
    }

    async fn request_restart(&self, document: &DocumentId) -> Result<()> {
        info!("Simulated backend restart of {}", document);
        self.post(Message::BackendStatusChanged {
            document: document.clone(),
            status: BackendStatus::Restarting,
        })
        .await?;
        self.cycle_status(document).await
    }
}

// ─────────────────────────────────────────────────────────
// Backend Peers
// ─────────────────────────────────────────────────────────

/// The latest backend peer of every document
#[derive(Debug)]
pub struct BackendPeers {
    links: HashMap<DocumentId, mpsc::Sender<BackendCommand>>,
    sent_tx: mpsc::Sender<(DocumentId, Value)>,
}

impl BackendPeers {
    /// Actions received by any peer are reported on the returned receiver
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<(DocumentId, Value)>) {
        let (sent_tx, sent_rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                links: HashMap::new(),
                sent_tx,
            },
            sent_rx,
        )
    }

    /// Take over a freshly accepted peer, replacing the document's previous one
    pub fn accept(&mut self, peer: BackendPeer) {
        let document = peer.document().clone();
        let (tx, rx) = mpsc::channel(PEER_COMMAND_BUFFER);
        debug!(
            "Backend peer for channel #{} of {} accepted",
            peer.channel_id(),
            document
        );
        tokio::spawn(run_peer(peer, rx, self.sent_tx.clone()));
        self.links.insert(document, tx);
    }

    /// Deliver a scripted command to the document's current peer
    pub async fn dispatch(&mut self, document: &DocumentId, command: BackendCommand) -> Result<()> {
        let Some(link) = self.links.get(document) else {
            return Err(Error::ChannelClosed);
        };
        if link.send(command).await.is_err() {
            self.links.remove(document);
            return Err(Error::ChannelClosed);
        }
        Ok(())
    }

    pub fn has(&self, document: &DocumentId) -> bool {
        self.links.contains_key(document)
    }
}

/// Relay scripted commands to one peer and report what the frontend sends
async fn run_peer(
    mut peer: BackendPeer,
    mut commands: mpsc::Receiver<BackendCommand>,
    sent_tx: mpsc::Sender<(DocumentId, Value)>,
) {
    let document = peer.document().clone();
    let channel_id = peer.channel_id();

    loop {
        tokio::select! {
            action = peer.recv() => {
                match action {
                    Some(envelope) => {
                        if sent_tx.send((document.clone(), envelope)).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        debug!("Frontend released channel #{}", channel_id);
                        break;
                    }
                }
            }
            command = commands.recv() => {
                match command {
                    Some(BackendCommand::Reply(message)) => {
                        if let Err(e) = peer.reply(message).await {
                            warn!("Channel #{} for {} is gone: {}", channel_id, document, e);
                            break;
                        }
                    }
                    Some(BackendCommand::Close) | None => {
                        peer.close().await;
                        break;
                    }
                }
            }
        }
    }
}
