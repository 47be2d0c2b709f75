//! Action handlers: UpdateAction dispatch and background task spawning

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn, Instrument};

use sparkconn_comm::{CommAction, CommTransport};
use sparkconn_core::logging::document_span;
use sparkconn_core::prelude::{Error, Result};

use crate::config::CommSettings;
use crate::handler::UpdateAction;
use crate::host::DocumentHost;
use crate::message::Message;

pub mod channel;
pub use channel::open_and_forward;

/// Execute an action by spawning a background task
pub fn handle_action<T, H>(
    action: UpdateAction,
    msg_tx: mpsc::Sender<Message>,
    transport: Arc<T>,
    host: Arc<H>,
    comm: &CommSettings,
) where
    T: CommTransport + Sync + 'static,
    H: DocumentHost + Sync + 'static,
{
    let span = document_span(action.document());
    match action {
        UpdateAction::OpenChannel { document, ticket } => {
            let target = comm.target.clone();
            let timeout = comm.open_timeout();
            tokio::spawn(
                open_and_forward(transport, document, ticket, target, timeout, msg_tx)
                    .instrument(span),
            );
        }

        UpdateAction::SendAction {
            document,
            sender,
            action,
        } => {
            let name = action.name();
            let description = action.description();
            // Queued here, in update order; the channel's writer delivers it
            let submitted = sender.submit(action);
            tokio::spawn(
                async move {
                    let Err(e) = delivered(submitted).await else {
                        return;
                    };
                    if e.is_recoverable() {
                        warn!("Failed to send {} for {}: {}", description, document, e);
                    } else {
                        error!("Failed to send {} for {}: {}", description, document, e);
                    }
                    let _ = msg_tx
                        .send(Message::ActionSendFailed {
                            document,
                            action: name,
                            error: e.to_string(),
                        })
                        .await;
                }
                .instrument(span),
            );
        }

        UpdateAction::RequestReconnect {
            document,
            generation,
            reset,
        } => {
            tokio::spawn(
                async move {
                    let msg = match host.request_reconnect(&document).await {
                        Ok(()) => Message::ReconnectCompleted {
                            document,
                            generation,
                            reset,
                        },
                        Err(e) => Message::HostRequestFailed {
                            document,
                            operation: "reconnect",
                            error: e.to_string(),
                        },
                    };
                    let _ = msg_tx.send(msg).await;
                }
                .instrument(span),
            );
        }

        UpdateAction::DisconnectAndRestart { document, sender } => {
            let submitted = sender.submit(CommAction::Disconnect);
            tokio::spawn(
                async move {
                    // The backend may already be gone
                    if let Err(e) = delivered(submitted).await {
                        debug!("Disconnect for {} not delivered: {}", document, e);
                    }

                    if let Err(e) = host.request_restart(&document).await {
                        let _ = msg_tx
                            .send(Message::HostRequestFailed {
                                document,
                                operation: "restart",
                                error: e.to_string(),
                            })
                            .await;
                    }
                }
                .instrument(span),
            );
        }
    }
}

/// Wait for a submitted action to leave the channel's queue
async fn delivered(submitted: Result<oneshot::Receiver<Result<()>>>) -> Result<()> {
    match submitted?.await {
        Ok(result) => result,
        // Writer stopped with the action still queued
        Err(_) => Err(Error::ChannelClosed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use sparkconn_comm::{ChannelHandle, LoopbackTransport};
    use sparkconn_core::{DocumentId, SavedConfiguration};

    const WAIT: Duration = Duration::from_secs(5);

    /// Host that reports each request on a channel
    struct RecordingHost {
        calls: mpsc::UnboundedSender<&'static str>,
    }

    impl DocumentHost for RecordingHost {
        async fn request_reconnect(&self, _document: &DocumentId) -> Result<()> {
            let _ = self.calls.send("reconnect");
            Ok(())
        }

        async fn request_restart(&self, _document: &DocumentId) -> Result<()> {
            let _ = self.calls.send("restart");
            Ok(())
        }
    }

    struct Fixture {
        transport: Arc<LoopbackTransport>,
        host: Arc<RecordingHost>,
        host_calls: mpsc::UnboundedReceiver<&'static str>,
        msg_tx: mpsc::Sender<Message>,
        msg_rx: mpsc::Receiver<Message>,
        peers: mpsc::UnboundedReceiver<sparkconn_comm::BackendPeer>,
        comm: CommSettings,
    }

    fn fixture() -> Fixture {
        let (transport, peers) = LoopbackTransport::new();
        let (calls, host_calls) = mpsc::unbounded_channel();
        let (msg_tx, msg_rx) = mpsc::channel(16);
        Fixture {
            transport: Arc::new(transport),
            host: Arc::new(RecordingHost { calls }),
            host_calls,
            msg_tx,
            msg_rx,
            peers,
            comm: CommSettings::default(),
        }
    }

    impl Fixture {
        fn run(&self, action: UpdateAction) {
            handle_action(
                action,
                self.msg_tx.clone(),
                self.transport.clone(),
                self.host.clone(),
                &self.comm,
            );
        }

        async fn open(&mut self, document: &DocumentId) -> ChannelHandle {
            self.run(UpdateAction::OpenChannel {
                document: document.clone(),
                ticket: 1,
            });
            match tokio::time::timeout(WAIT, self.msg_rx.recv()).await.unwrap() {
                Some(Message::ChannelOpened { channel, .. }) => channel,
                other => panic!("Expected ChannelOpened, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_actions_on_one_channel_arrive_in_order() {
        let mut f = fixture();
        let doc = DocumentId::new("nb1");
        let channel = f.open(&doc).await;
        let mut peer = f.peers.recv().await.unwrap();

        for action in [
            CommAction::Connect(SavedConfiguration::default()),
            CommAction::Open,
            CommAction::Disconnect,
        ] {
            f.run(UpdateAction::SendAction {
                document: doc.clone(),
                sender: channel.sender(),
                action,
            });
        }

        let mut sent = Vec::new();
        for _ in 0..4 {
            let envelope = tokio::time::timeout(WAIT, peer.recv()).await.unwrap().unwrap();
            sent.push(envelope["action"].as_str().unwrap().to_string());
        }
        assert_eq!(sent, vec!["open", "connect", "open", "disconnect"]);
    }

    #[tokio::test]
    async fn test_send_on_closed_channel_reports_failure() {
        let mut f = fixture();
        let doc = DocumentId::new("nb1");
        let channel = f.open(&doc).await;
        channel.close();

        f.run(UpdateAction::SendAction {
            document: doc.clone(),
            sender: channel.sender(),
            action: CommAction::Connect(SavedConfiguration::default()),
        });

        match tokio::time::timeout(WAIT, f.msg_rx.recv()).await.unwrap() {
            Some(Message::ActionSendFailed {
                document, action, ..
            }) => {
                assert_eq!(document, doc);
                assert_eq!(action, "connect");
            }
            other => panic!("Expected ActionSendFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disconnect_delivered_before_restart() {
        let mut f = fixture();
        let doc = DocumentId::new("nb1");
        let channel = f.open(&doc).await;
        let mut peer = f.peers.recv().await.unwrap();
        assert_eq!(peer.recv().await.unwrap()["action"], "open");

        f.run(UpdateAction::DisconnectAndRestart {
            document: doc.clone(),
            sender: channel.sender(),
        });

        let call = tokio::time::timeout(WAIT, f.host_calls.recv()).await.unwrap();
        assert_eq!(call, Some("restart"));
        assert_eq!(peer.try_recv().unwrap()["action"], "disconnect");
    }

    #[tokio::test]
    async fn test_reconnect_completion_carries_generation() {
        let mut f = fixture();
        let doc = DocumentId::new("nb1");

        f.run(UpdateAction::RequestReconnect {
            document: doc.clone(),
            generation: 4,
            reset: true,
        });

        match tokio::time::timeout(WAIT, f.msg_rx.recv()).await.unwrap() {
            Some(Message::ReconnectCompleted {
                generation, reset, ..
            }) => {
                assert_eq!(generation, 4);
                assert!(reset);
            }
            other => panic!("Expected ReconnectCompleted, got {:?}", other),
        }
        assert_eq!(f.host_calls.try_recv().unwrap(), "reconnect");
    }
}
