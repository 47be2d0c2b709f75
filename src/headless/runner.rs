//! Headless mode runner - main event loop without a UI
//!
//! Drives the coordinator engine from stdin commands over the loopback
//! transport, with a simulated document host, and reports engine events.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use sparkconn_app::config;
use sparkconn_app::{Engine, EngineEvent, InMemoryMetadataStore};
use sparkconn_comm::{BackendPeer, LoopbackTransport};
use sparkconn_core::prelude::*;
use sparkconn_core::DocumentId;

use super::commands::{parse_command, HostCommand, Route};
use super::simulator::{BackendPeers, SimulatedHost};
use super::{HeadlessEvent, OutputMode};

type HeadlessEngine = Engine<LoopbackTransport, SimulatedHost>;

/// Queue depth between the stdin reader thread and the event loop
const STDIN_BUFFER: usize = 64;

/// After stdin closes, exit once nothing happened for this long
const IDLE_AFTER_EOF: Duration = Duration::from_millis(250);

/// Run the coordinator, reading commands from stdin until quit or EOF
pub async fn run_headless(base_path: &Path, mode: OutputMode) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("Spark connector starting in HEADLESS mode ({:?})", mode);
    info!("Base path: {}", base_path.display());
    info!("═══════════════════════════════════════════════════════");

    if let Err(e) = config::init_config_dir(base_path) {
        warn!("Failed to initialize .sparkconn directory: {}", e);
    }
    let settings = config::load_settings(base_path);

    // The simulated host posts into the engine channel, so create it first
    let channel = mpsc::channel(settings.engine.channel_capacity.max(1));
    let host = Arc::new(SimulatedHost::new(channel.0.clone()));
    let (transport, accepted) = LoopbackTransport::new();
    let (peers, sent_rx) = BackendPeers::new(settings.engine.channel_capacity);

    let mut engine = Engine::with_channel(
        settings,
        Arc::new(transport),
        host,
        Arc::new(InMemoryMetadataStore::new()),
        channel,
    );
    let mut events = engine.subscribe();

    let (cmd_tx, cmd_rx) = mpsc::channel(STDIN_BUFFER);
    std::thread::spawn(move || {
        read_stdin_blocking(cmd_tx);
    });

    let result = headless_event_loop(
        &mut engine,
        &mut events,
        Inputs {
            commands: cmd_rx,
            accepted,
            sent: sent_rx,
        },
        peers,
        mode,
    )
    .await;

    engine.shutdown().await;
    publish_engine_events(&engine, &mut events, mode);

    info!("Spark connector headless mode exiting");
    result
}

/// Event sources besides the engine's own channel
struct Inputs {
    commands: mpsc::Receiver<Result<HostCommand>>,
    accepted: mpsc::UnboundedReceiver<BackendPeer>,
    sent: mpsc::Receiver<(DocumentId, Value)>,
}

/// Main headless event loop
async fn headless_event_loop(
    engine: &mut HeadlessEngine,
    events: &mut broadcast::Receiver<EngineEvent>,
    mut inputs: Inputs,
    mut peers: BackendPeers,
    mode: OutputMode,
) -> Result<()> {
    let mut stdin_open = true;
    let idle = tokio::time::sleep(IDLE_AFTER_EOF);
    tokio::pin!(idle);

    loop {
        if engine.should_quit() {
            info!("Quit requested");
            break;
        }

        tokio::select! {
            msg = engine.msg_rx.recv() => {
                match msg {
                    Some(msg) => engine.process_message(msg),
                    None => {
                        info!("Message channel closed");
                        break;
                    }
                }
            }
            command = inputs.commands.recv(), if stdin_open => {
                match command {
                    Some(Ok(command)) => apply_command(engine, &mut peers, command, mode).await,
                    Some(Err(e)) => {
                        HeadlessEvent::input_error(&e).publish(mode);
                        if e.is_fatal() {
                            error!("Stdin failed, no further commands: {}", e);
                            stdin_open = false;
                        } else {
                            warn!("Invalid stdin command: {}", e);
                        }
                    }
                    None => {
                        // In-flight opens and reconnects still get to finish
                        info!("Stdin closed, waiting for the coordinator to settle");
                        stdin_open = false;
                    }
                }
            }
            Some(peer) = inputs.accepted.recv() => peers.accept(peer),
            Some((document, envelope)) = inputs.sent.recv() => {
                HeadlessEvent::sent(document.as_str(), &envelope).publish(mode);
            }
            _ = &mut idle, if !stdin_open => {
                info!("Coordinator idle after end of input");
                break;
            }
        }

        publish_engine_events(engine, events, mode);
        idle.as_mut().reset(tokio::time::Instant::now() + IDLE_AFTER_EOF);
    }

    Ok(())
}

async fn apply_command(
    engine: &mut HeadlessEngine,
    peers: &mut BackendPeers,
    command: HostCommand,
    mode: OutputMode,
) {
    match command.route() {
        Route::Engine(message) => engine.process_message(message),
        Route::Backend(document, command) => {
            if let Err(e) = peers.dispatch(&document, command).await {
                warn!("No backend channel for {}: {}", document, e);
                HeadlessEvent::error(format!("no backend channel for {}", document), false)
                    .publish(mode);
            }
        }
        Route::Ignore => {}
    }
}

/// Report every engine event queued since the last call
fn publish_engine_events(
    engine: &HeadlessEngine,
    events: &mut broadcast::Receiver<EngineEvent>,
    mode: OutputMode,
) {
    loop {
        match events.try_recv() {
            Ok(event) => {
                if let Some(event) = HeadlessEvent::from_engine(&event, || engine.view().render())
                {
                    event.publish(mode);
                }
            }
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!("Headless output lagged, {} event(s) skipped", skipped);
            }
            Err(_) => break,
        }
    }
}

/// Read commands from stdin until EOF (blocking; runs on its own thread)
fn read_stdin_blocking(cmd_tx: mpsc::Sender<Result<HostCommand>>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        match line {
            Ok(line) => match parse_command(&line) {
                Ok(Some(command)) => {
                    let quit = command == HostCommand::Quit(true);
                    if cmd_tx.blocking_send(Ok(command)).is_err() || quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    if cmd_tx.blocking_send(Err(e)).is_err() {
                        break;
                    }
                }
            },
            Err(e) => {
                let _ = cmd_tx.blocking_send(Err(Error::Io(e)));
                break;
            }
        }
    }

    info!("Stdin reader exiting");
}
