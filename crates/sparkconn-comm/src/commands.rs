//! Outbound action building and sending over a comm channel
//!
//! This module provides:
//! - Action message building in the `{type: "action", ...}` envelope
//! - A cloneable sender bound to one channel, aware of its closed state

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};

use sparkconn_core::prelude::*;
use sparkconn_core::SavedConfiguration;

use crate::channel::ChannelId;

/// Actions the frontend sends to the backend
#[derive(Debug, Clone, PartialEq)]
pub enum CommAction {
    /// Handshake: ask the backend which page to show
    Open,
    /// Start a Spark session with the chosen options
    Connect(SavedConfiguration),
    /// Stop the Spark session (best-effort, no reply expected)
    Disconnect,
}

impl CommAction {
    /// Wire name of the action
    pub fn name(&self) -> &'static str {
        match self {
            CommAction::Open => "open",
            CommAction::Connect(_) => "connect",
            CommAction::Disconnect => "disconnect",
        }
    }

    /// Build the JSON action envelope
    pub fn build(&self) -> Value {
        match self {
            CommAction::Connect(config) => json!({
                "type": "action",
                "action": self.name(),
                "action-data": {
                    "bundled_options": config.bundled_options,
                    "list_of_options": config.list_of_options,
                },
            }),
            _ => json!({
                "type": "action",
                "action": self.name(),
            }),
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            CommAction::Open => "open handshake",
            CommAction::Connect(_) => "connect",
            CommAction::Disconnect => "disconnect",
        }
    }
}

/// An action waiting for its turn on a channel
#[derive(Debug)]
pub struct QueuedAction {
    pub action: CommAction,
    /// Resolves with the delivery result
    pub done: oneshot::Sender<Result<()>>,
}

/// Sends actions to the backend over one channel
#[derive(Clone)]
pub struct CommSender {
    channel_id: ChannelId,
    /// Channel carrying JSON messages to the backend
    outbound_tx: mpsc::Sender<Value>,
    /// Per-channel FIFO drained by the channel's writer task
    queue_tx: mpsc::UnboundedSender<QueuedAction>,
    /// Shared with the owning `ChannelHandle`
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for CommSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommSender")
            .field("channel_id", &self.channel_id)
            .field("outbound_tx", &"<channel>")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl CommSender {
    pub fn new(
        channel_id: ChannelId,
        outbound_tx: mpsc::Sender<Value>,
        queue_tx: mpsc::UnboundedSender<QueuedAction>,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            channel_id,
            outbound_tx,
            queue_tx,
            closed,
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// True once the channel was closed by either side
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.outbound_tx.is_closed()
    }

    /// Send an action (fire-and-forget; the backend answers with its own messages)
    pub async fn send(&self, action: &CommAction) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }

        debug!(
            "Sending '{}' on channel #{}",
            action.description(),
            self.channel_id
        );

        self.outbound_tx
            .send(action.build())
            .await
            .map_err(|_| Error::channel_send(format!("comm channel #{}", self.channel_id)))
    }

    /// Queue an action behind everything already submitted on this channel.
    ///
    /// The returned receiver resolves once the writer task delivered it; it
    /// is dropped unresolved if the channel shuts down first.
    pub fn submit(&self, action: CommAction) -> Result<oneshot::Receiver<Result<()>>> {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }

        let (done, delivered) = oneshot::channel();
        self.queue_tx
            .send(QueuedAction { action, done })
            .map_err(|_| Error::ChannelClosed)?;
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparkconn_core::SparkOption;

    fn test_sender(
        id: ChannelId,
        tx: mpsc::Sender<Value>,
        closed: Arc<AtomicBool>,
    ) -> (CommSender, mpsc::UnboundedReceiver<QueuedAction>) {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        (CommSender::new(id, tx, queue_tx, closed), queue_rx)
    }

    #[test]
    fn test_build_open() {
        let json = CommAction::Open.build();
        assert_eq!(json, json!({"type": "action", "action": "open"}));
    }

    #[test]
    fn test_build_disconnect_has_no_action_data() {
        let json = CommAction::Disconnect.build();
        assert_eq!(json["action"], "disconnect");
        assert!(json.get("action-data").is_none());
    }

    #[test]
    fn test_build_connect_carries_options() {
        let config = SavedConfiguration {
            bundled_options: vec!["LongRunningAnalysis".to_string()],
            list_of_options: vec![SparkOption::new("spark.executor.memory", "4g")],
        };
        let json = CommAction::Connect(config).build();

        assert_eq!(json["type"], "action");
        assert_eq!(json["action"], "connect");
        assert_eq!(
            json["action-data"]["bundled_options"],
            json!(["LongRunningAnalysis"])
        );
        assert_eq!(
            json["action-data"]["list_of_options"],
            json!([{"name": "spark.executor.memory", "value": "4g"}])
        );
    }

    #[tokio::test]
    async fn test_send_delivers_envelope() {
        let (tx, mut rx) = mpsc::channel(4);
        let (sender, _queue) = test_sender(7, tx, Arc::new(AtomicBool::new(false)));

        sender.send(&CommAction::Open).await.unwrap();

        let sent = rx.recv().await.unwrap();
        assert_eq!(sent["action"], "open");
    }

    #[tokio::test]
    async fn test_send_on_closed_channel_fails() {
        let (tx, _rx) = mpsc::channel(4);
        let closed = Arc::new(AtomicBool::new(false));
        let (sender, _queue) = test_sender(7, tx, closed.clone());

        closed.store(true, Ordering::SeqCst);

        let err = sender.send(&CommAction::Disconnect).await.unwrap_err();
        assert!(matches!(err, Error::ChannelClosed));
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_fails() {
        let (tx, rx) = mpsc::channel(4);
        let (sender, _queue) = test_sender(3, tx, Arc::new(AtomicBool::new(false)));
        drop(rx);

        assert!(sender.is_closed());
        assert!(sender.send(&CommAction::Open).await.is_err());
    }

    #[test]
    fn test_submit_queues_in_order() {
        let (tx, _rx) = mpsc::channel(4);
        let (sender, mut queue) = test_sender(5, tx, Arc::new(AtomicBool::new(false)));

        let _connect = sender
            .submit(CommAction::Connect(SavedConfiguration::default()))
            .unwrap();
        let _disconnect = sender.submit(CommAction::Disconnect).unwrap();

        assert_eq!(queue.try_recv().unwrap().action.name(), "connect");
        assert_eq!(queue.try_recv().unwrap().action.name(), "disconnect");
    }

    #[test]
    fn test_submit_on_closed_channel_fails() {
        let (tx, _rx) = mpsc::channel(4);
        let closed = Arc::new(AtomicBool::new(true));
        let (sender, mut queue) = test_sender(5, tx, closed);

        assert!(matches!(
            sender.submit(CommAction::Open),
            Err(Error::ChannelClosed)
        ));
        assert!(queue.try_recv().is_err());
    }
}
