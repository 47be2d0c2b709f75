//! sparkconn-app - Connection coordinator for Spark-connected documents
//!
//! This crate implements the TEA (The Elm Architecture) pattern for the
//! coordinator: a per-document session registry, the phase objects shown to
//! the user, the `update()` state machine, and the Engine that runs it over a
//! comm transport and a document host.

pub mod actions;
pub mod config;
pub mod engine;
pub mod engine_event;
pub mod handler;
pub mod host;
pub mod message;
pub mod phases;
pub mod process;
pub mod session;
pub mod session_registry;
pub mod state;

// Re-export primary types
pub use config::Settings;
pub use engine::Engine;
pub use engine_event::EngineEvent;
pub use handler::{UpdateAction, UpdateResult};
pub use host::{Document, DocumentHost, InMemoryMetadataStore, LocalDocumentHost, MetadataStore};
pub use message::Message;
pub use phases::{DisplayedPhase, PhaseBundle, PhaseView};
pub use session::{Session, SessionHandle, SessionId};
pub use session_registry::{OpenTicket, SessionRegistry};
pub use state::AppState;
