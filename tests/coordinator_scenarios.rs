//! End-to-end coordinator scenarios
//!
//! Drives the Engine over the loopback transport with the simulated host, so
//! channel opens, forwarding and host requests run as real tokio tasks.
//!
//! Run with: cargo test --test coordinator_scenarios

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use spark_connector::headless::simulator::SimulatedHost;
use sparkconn_app::{
    DisplayedPhase, Engine, EngineEvent, InMemoryMetadataStore, Message, Settings,
};
use sparkconn_comm::test_utils::{
    connect_error_message, connected_message, follow_log_message, open_config_message,
};
use sparkconn_comm::{BackendPeer, LoopbackTransport};
use sparkconn_core::{ConnectionStatus, DocumentId, SparkOption};

type TestEngine = Engine<LoopbackTransport, SimulatedHost>;

const WAIT: Duration = Duration::from_secs(5);

// ─────────────────────────────────────────────────────────
// Test Harness
// ─────────────────────────────────────────────────────────

struct Harness {
    engine: TestEngine,
    transport: LoopbackTransport,
    accepted: mpsc::UnboundedReceiver<BackendPeer>,
    events: broadcast::Receiver<EngineEvent>,
}

fn harness() -> Harness {
    let settings = Settings::default();
    let channel = mpsc::channel(settings.engine.channel_capacity);
    let host = Arc::new(SimulatedHost::new(channel.0.clone()));
    let (transport, accepted) = LoopbackTransport::new();

    let engine = Engine::with_channel(
        settings,
        Arc::new(transport.clone()),
        host,
        Arc::new(InMemoryMetadataStore::new()),
        channel,
    );
    let events = engine.subscribe();

    Harness {
        engine,
        transport,
        accepted,
        events,
    }
}

impl Harness {
    /// Process engine messages until `done` holds
    async fn pump_until(&mut self, mut done: impl FnMut(&TestEngine) -> bool) {
        while !done(&self.engine) {
            let msg = tokio::time::timeout(WAIT, self.engine.msg_rx.recv())
                .await
                .expect("timed out waiting for the coordinator")
                .expect("engine channel closed");
            self.engine.process_message(msg);
        }
    }

    async fn next_peer(&mut self) -> BackendPeer {
        tokio::time::timeout(WAIT, self.accepted.recv())
            .await
            .expect("timed out waiting for a channel open")
            .expect("transport dropped")
    }

    /// The accepted peer backing the document's current session
    async fn current_peer(&mut self, document: &DocumentId) -> BackendPeer {
        let channel_id = self
            .engine
            .state
            .registry
            .get(document)
            .expect("no session")
            .channel_id();
        loop {
            let peer = self.next_peer().await;
            if peer.channel_id() == channel_id {
                return peer;
            }
        }
    }

    fn send(&mut self, message: Message) {
        self.engine.process_message(message);
    }

    /// Displayed phase names announced since the last call
    fn phases(&mut self) -> Vec<&'static str> {
        let mut names = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let EngineEvent::PhaseChanged { new, .. } = event {
                names.push(new.name());
            }
        }
        names
    }

    /// Focus the document and bring its session up to Configuring
    async fn configure(&mut self, document: &DocumentId) -> BackendPeer {
        self.send(Message::FocusChanged {
            document: Some(document.clone()),
        });
        self.send(Message::DocumentReady {
            document: document.clone(),
        });
        self.send(Message::ConnectionStatusChanged {
            document: document.clone(),
            status: ConnectionStatus::Connected,
        });
        self.pump_until(|e| e.state.registry.has(document)).await;

        let mut peer = self.current_peer(document).await;
        assert_eq!(peer.recv().await.unwrap()["action"], "open");

        peer.reply(open_config_message(&["spark3", "gpu"]))
            .await
            .unwrap();
        let expected = DisplayedPhase::Configuring(document.clone());
        self.pump_until(|e| e.state.displayed == expected).await;
        peer
    }
}

// ─────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_configure_connect_and_stream_logs() {
    let mut h = harness();
    let doc = DocumentId::new("nb1");

    let mut peer = h.configure(&doc).await;
    assert_eq!(h.phases(), vec!["loading", "configuring"]);

    h.send(Message::AddOption {
        document: doc.clone(),
        name: "spark.executor.memory".to_string(),
        value: "4g".to_string(),
    });
    h.send(Message::ConnectRequested {
        document: doc.clone(),
    });
    assert_eq!(h.engine.state.displayed, DisplayedPhase::Connecting(doc.clone()));

    let connect = tokio::time::timeout(WAIT, peer.recv()).await.unwrap().unwrap();
    assert_eq!(connect["action"], "connect");
    assert_eq!(
        connect["action-data"]["list_of_options"][0]["name"],
        "spark.executor.memory"
    );

    peer.reply(follow_log_message("starting driver")).await.unwrap();
    peer.reply(connected_message(Some("http://history:18080")))
        .await
        .unwrap();
    let connected = DisplayedPhase::Connected(doc.clone());
    h.pump_until(|e| e.state.displayed == connected).await;

    assert!(h.engine.view().render().contains("http://history:18080"));
    let events: Vec<_> = std::iter::from_fn(|| h.events.try_recv().ok()).collect();
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::LogLine { line, .. } if line == "starting driver"
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::ConfigurationSaved { .. })));
}

#[tokio::test]
async fn test_restart_reset_reseeds_saved_configuration() {
    let mut h = harness();
    let doc = DocumentId::new("nb1");

    let mut peer = h.configure(&doc).await;
    h.send(Message::ToggleBundle {
        document: doc.clone(),
        bundle: "gpu".to_string(),
    });
    h.send(Message::ConnectRequested {
        document: doc.clone(),
    });
    peer.reply(connected_message(None)).await.unwrap();
    let connected = DisplayedPhase::Connected(doc.clone());
    h.pump_until(|e| e.state.displayed == connected).await;

    h.send(Message::ReconfigureRequested {
        document: doc.clone(),
    });
    assert_eq!(h.engine.state.displayed, DisplayedPhase::Loading);

    // The backend restarts, the registry is rebuilt and the session reopened
    h.pump_until(|e| e.state.registry.generation() == 1 && e.state.registry.has(&doc))
        .await;
    assert!(std::iter::from_fn(|| h.events.try_recv().ok())
        .any(|e| e == EngineEvent::Reset { generation: 1 }));

    let peer = h.current_peer(&doc).await;
    peer.reply(open_config_message(&["spark3", "gpu"]))
        .await
        .unwrap();
    let configuring = DisplayedPhase::Configuring(doc.clone());
    h.pump_until(|e| e.state.displayed == configuring).await;

    let selection = h
        .engine
        .state
        .registry
        .get(&doc)
        .unwrap()
        .session
        .phases
        .configuring
        .selection()
        .clone();
    assert_eq!(selection.bundled_options, vec!["gpu".to_string()]);
}

#[tokio::test]
async fn test_connect_error_then_reconfigure_sends_disconnect() {
    let mut h = harness();
    let doc = DocumentId::new("nb1");

    let mut peer = h.configure(&doc).await;
    h.send(Message::ConnectRequested {
        document: doc.clone(),
    });
    assert_eq!(peer.recv().await.unwrap()["action"], "connect");

    peer.reply(connect_error_message("timeout")).await.unwrap();
    let failed = DisplayedPhase::ConnectFailed(doc.clone());
    h.pump_until(|e| e.state.displayed == failed).await;
    assert!(h.engine.view().render().contains("timeout"));

    h.send(Message::ReconfigureRequested {
        document: doc.clone(),
    });
    assert_eq!(h.engine.state.displayed, DisplayedPhase::Loading);

    let disconnect = tokio::time::timeout(WAIT, peer.recv()).await.unwrap().unwrap();
    assert_eq!(disconnect["action"], "disconnect");
}

#[tokio::test]
async fn test_backend_close_falls_back_to_loading() {
    let mut h = harness();
    let doc = DocumentId::new("nb1");

    let mut peer = h.configure(&doc).await;
    h.phases();

    peer.close().await;
    h.pump_until(|e| !e.state.registry.has(&doc)).await;

    assert_eq!(h.engine.state.displayed, DisplayedPhase::Loading);
    assert_eq!(h.phases(), vec!["loading"]);
}

#[tokio::test]
async fn test_refused_open_reports_fault_and_recovers() {
    let mut h = harness();
    let doc = DocumentId::new("nb1");
    h.transport.refuse_opens(true);

    h.send(Message::FocusChanged {
        document: Some(doc.clone()),
    });
    h.send(Message::ConnectionStatusChanged {
        document: doc.clone(),
        status: ConnectionStatus::Connected,
    });
    h.pump_until(|e| e.state.fault_seq == 1).await;
    assert!(!h.engine.state.registry.has_pending(&doc));

    h.transport.refuse_opens(false);
    h.send(Message::ConnectionStatusChanged {
        document: doc.clone(),
        status: ConnectionStatus::Connected,
    });
    h.pump_until(|e| e.state.registry.has(&doc)).await;
}

#[tokio::test]
async fn test_unfocused_document_messages_are_dropped() {
    let mut h = harness();
    let d1 = DocumentId::new("nb1");
    let d2 = DocumentId::new("nb2");

    let peer = h.configure(&d1).await;
    h.send(Message::FocusChanged {
        document: Some(d2.clone()),
    });

    peer.reply(connected_message(None)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.engine.drain_pending_messages();

    assert_eq!(h.engine.state.displayed, DisplayedPhase::Loading);
    assert!(
        !h.engine
            .state
            .registry
            .get(&d1)
            .unwrap()
            .session
            .watching_backend
    );
}

#[tokio::test]
async fn test_saved_configuration_written_on_connect() {
    let mut h = harness();
    let doc = DocumentId::new("nb1");

    h.configure(&doc).await;
    h.send(Message::AddOption {
        document: doc.clone(),
        name: "spark.driver.memory".to_string(),
        value: "2g".to_string(),
    });
    h.send(Message::ConnectRequested {
        document: doc.clone(),
    });

    let saved = std::iter::from_fn(|| h.events.try_recv().ok()).find_map(|e| match e {
        EngineEvent::ConfigurationSaved { configuration, .. } => Some(configuration),
        _ => None,
    });
    assert_eq!(
        saved.unwrap().list_of_options,
        vec![SparkOption::new("spark.driver.memory", "2g")]
    );
}
