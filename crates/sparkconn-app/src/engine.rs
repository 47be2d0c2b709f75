//! Engine - owns the coordinator state and its message loop plumbing
//!
//! The Engine wires the TEA state to a comm transport and a document host.
//! Frontends feed it host events as [`Message`]s, drive
//! [`Engine::process_message`] from `msg_rx`, and observe the outcome through
//! [`Engine::subscribe`].

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::info;

use sparkconn_comm::CommTransport;
use sparkconn_core::{logging, DocumentId};

use crate::config::Settings;
use crate::engine_event::EngineEvent;
use crate::host::{DocumentHost, MetadataStore};
use crate::message::Message;
use crate::phases::{DisplayedPhase, PhaseView};
use crate::process;
use crate::session::SessionId;
use crate::state::AppState;

/// Capacity of the engine event broadcast channel
const EVENT_CAPACITY: usize = 256;

/// Lightweight snapshot of state for change detection.
///
/// Captured before message processing, compared after to detect
/// what changed and emit appropriate EngineEvents.
#[derive(Debug, Clone)]
struct StateSnapshot {
    displayed: DisplayedPhase,
    sessions: Vec<(DocumentId, SessionId)>,
    generation: u64,
    saved_seq: u64,
    fault_seq: u64,
    log_seq: u64,
}

impl StateSnapshot {
    fn capture(state: &AppState) -> Self {
        let mut sessions: Vec<_> = state
            .registry
            .documents()
            .filter_map(|doc| {
                state
                    .registry
                    .get(doc)
                    .map(|h| (doc.clone(), h.session.id))
            })
            .collect();
        sessions.sort_by_key(|(_, id)| *id);

        Self {
            displayed: state.displayed.clone(),
            sessions,
            generation: state.registry.generation(),
            saved_seq: state.saved_seq,
            fault_seq: state.fault_seq,
            log_seq: state.log_seq,
        }
    }
}

/// Orchestration engine for the Spark connection coordinator.
///
/// Encapsulates:
/// - TEA state management
/// - The unified message channel
/// - The comm transport and document host used by background actions
/// - Event broadcasting for external consumers
pub struct Engine<T, H> {
    /// TEA application state (the Model)
    pub state: AppState,

    /// Sender half of the unified message channel.
    /// Clone this to give to input sources (host bridge, stdin reader).
    pub msg_tx: mpsc::Sender<Message>,

    /// Receiver half of the unified message channel.
    pub msg_rx: mpsc::Receiver<Message>,

    transport: Arc<T>,

    host: Arc<H>,

    /// Loaded settings
    pub settings: Settings,

    event_tx: broadcast::Sender<EngineEvent>,
}

impl<T, H> Engine<T, H>
where
    T: CommTransport + Sync + 'static,
    H: DocumentHost + Sync + 'static,
{
    /// Create a new Engine with its own message channel.
    pub fn new(
        settings: Settings,
        transport: Arc<T>,
        host: Arc<H>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        let channel = mpsc::channel::<Message>(settings.engine.channel_capacity.max(1));
        Self::with_channel(settings, transport, host, metadata, channel)
    }

    /// Create an Engine around an existing message channel.
    ///
    /// Used when the host needs `msg_tx` before the engine exists.
    pub fn with_channel(
        settings: Settings,
        transport: Arc<T>,
        host: Arc<H>,
        metadata: Arc<dyn MetadataStore>,
        (msg_tx, msg_rx): (mpsc::Sender<Message>, mpsc::Receiver<Message>),
    ) -> Self {
        let state = AppState::with_settings(settings.clone(), metadata);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            state,
            msg_tx,
            msg_rx,
            transport,
            host,
            settings,
            event_tx,
        }
    }

    /// Subscribe to engine events.
    ///
    /// If the subscriber falls behind, older events are dropped and the
    /// receiver reports `broadcast::error::RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Process a single message through the TEA update cycle and emit
    /// EngineEvents for the resulting state changes.
    pub fn process_message(&mut self, msg: Message) {
        let _span = msg.document().map(|d| logging::document_span(d).entered());
        let pre = StateSnapshot::capture(&self.state);

        process::process_message(
            &mut self.state,
            msg,
            &self.msg_tx,
            &self.transport,
            &self.host,
        );

        let post = StateSnapshot::capture(&self.state);
        self.emit_events(&pre, &post);
    }

    /// Drain and process all pending messages from the channel.
    ///
    /// Returns the number of messages processed.
    pub fn drain_pending_messages(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
            count += 1;
        }
        count
    }

    /// Get a clone of the message sender for spawning input sources.
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    /// Check if the application should quit.
    pub fn should_quit(&self) -> bool {
        self.state.should_quit()
    }

    /// The displayed phase with its data
    pub fn view(&self) -> PhaseView<'_> {
        self.state.view()
    }

    /// Initiate shutdown: notify subscribers and close every channel.
    pub async fn shutdown(&mut self) {
        self.emit(EngineEvent::Shutdown);

        let open = self.state.registry.len();
        self.state.registry.clear();
        info!("Engine shut down ({} session(s) closed)", open);
    }

    /// Emit EngineEvents based on state changes after processing.
    fn emit_events(&self, pre: &StateSnapshot, post: &StateSnapshot) {
        if post.generation != pre.generation {
            self.emit(EngineEvent::Reset {
                generation: post.generation,
            });
        }

        for (document, session_id) in &pre.sessions {
            if !post.sessions.iter().any(|(_, id)| id == session_id) {
                self.emit(EngineEvent::SessionRemoved {
                    document: document.clone(),
                    session_id: *session_id,
                });
            }
        }
        for (document, session_id) in &post.sessions {
            if !pre.sessions.iter().any(|(_, id)| id == session_id) {
                self.emit(EngineEvent::SessionCreated {
                    document: document.clone(),
                    session_id: *session_id,
                });
            }
        }

        if post.saved_seq != pre.saved_seq {
            if let Some((document, configuration)) = &self.state.last_saved {
                self.emit(EngineEvent::ConfigurationSaved {
                    document: document.clone(),
                    configuration: configuration.clone(),
                });
            }
        }

        if post.log_seq != pre.log_seq {
            if let Some((document, line)) = &self.state.last_log {
                self.emit(EngineEvent::LogLine {
                    document: document.clone(),
                    line: line.clone(),
                });
            }
        }

        if post.fault_seq != pre.fault_seq {
            if let Some(fault) = &self.state.last_fault {
                self.emit(EngineEvent::Fault {
                    document: fault.document.clone(),
                    error: fault.error.clone(),
                });
            }
        }

        if post.displayed != pre.displayed {
            self.emit(EngineEvent::PhaseChanged {
                old: pre.displayed.clone(),
                new: post.displayed.clone(),
            });
        }
    }

    /// Emit a single EngineEvent to all subscribers.
    ///
    /// send() returns Err only if there are no receivers.
    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::InMemoryMetadataStore;
    use sparkconn_comm::LoopbackTransport;
    use sparkconn_core::prelude::Result;

    struct NullHost;

    impl DocumentHost for NullHost {
        async fn request_reconnect(&self, _document: &DocumentId) -> Result<()> {
            Ok(())
        }

        async fn request_restart(&self, _document: &DocumentId) -> Result<()> {
            Ok(())
        }
    }

    fn engine() -> Engine<LoopbackTransport, NullHost> {
        let (transport, _peers) = LoopbackTransport::new();
        Engine::new(
            Settings::default(),
            Arc::new(transport),
            Arc::new(NullHost),
            Arc::new(InMemoryMetadataStore::new()),
        )
    }

    #[tokio::test]
    async fn test_engine_drain_empty_channel() {
        let mut engine = engine();
        assert_eq!(engine.drain_pending_messages(), 0);
        assert_eq!(engine.view().name(), "not-attached");
    }

    #[tokio::test]
    async fn test_engine_process_quit_message() {
        let mut engine = engine();
        engine.process_message(Message::Quit);
        assert!(engine.should_quit());
    }

    #[tokio::test]
    async fn test_focus_emits_phase_changed() {
        let mut engine = engine();
        let mut events = engine.subscribe();

        engine.process_message(Message::FocusChanged {
            document: Some(DocumentId::new("nb1")),
        });

        assert_eq!(
            events.try_recv().unwrap(),
            EngineEvent::PhaseChanged {
                old: DisplayedPhase::NotAttached,
                new: DisplayedPhase::Loading,
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_drained_messages_are_processed() {
        let mut engine = engine();
        engine.msg_sender().try_send(Message::Quit).unwrap();
        assert_eq!(engine.drain_pending_messages(), 1);
        assert!(engine.should_quit());
    }

    #[tokio::test]
    async fn test_engine_shutdown() {
        let mut engine = engine();
        let mut events = engine.subscribe();

        engine.shutdown().await;

        assert_eq!(events.try_recv().unwrap(), EngineEvent::Shutdown);
        assert!(engine.state.registry.is_empty());
    }
}
