//! Domain events emitted by the Engine for external consumers
//!
//! Events are broadcast after each message processing cycle via
//! `Engine::subscribe()`. The headless runner turns them into NDJSON.

use sparkconn_core::{DocumentId, SavedConfiguration};

use crate::phases::DisplayedPhase;
use crate::session::SessionId;

/// Domain events emitted by the Engine for external consumers.
///
/// Events are derived by comparing state before and after each message, so
/// subscribers see the net change of a whole update cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    // ─────────────────────────────────────────────────────────
    // Display
    // ─────────────────────────────────────────────────────────
    /// The displayed phase changed
    PhaseChanged {
        old: DisplayedPhase,
        new: DisplayedPhase,
    },

    // ─────────────────────────────────────────────────────────
    // Session Lifecycle
    // ─────────────────────────────────────────────────────────
    /// A session was registered for a document
    SessionCreated {
        document: DocumentId,
        session_id: SessionId,
    },

    /// A session was removed from the registry
    SessionRemoved {
        document: DocumentId,
        session_id: SessionId,
    },

    /// Every session was discarded after a backend restart
    Reset { generation: u64 },

    // ─────────────────────────────────────────────────────────
    // Reporting
    // ─────────────────────────────────────────────────────────
    /// A configuration was persisted to document metadata
    ConfigurationSaved {
        document: DocumentId,
        configuration: SavedConfiguration,
    },

    /// A backend log line was shown
    LogLine { document: DocumentId, line: String },

    /// A protocol or transport fault was recorded
    Fault { document: DocumentId, error: String },

    // ─────────────────────────────────────────────────────────
    // Engine Lifecycle
    // ─────────────────────────────────────────────────────────
    /// Engine is shutting down
    Shutdown,
}

impl EngineEvent {
    /// Returns a short string label for this event type (for logging/debugging).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. } => "phase_changed",
            Self::SessionCreated { .. } => "session_created",
            Self::SessionRemoved { .. } => "session_removed",
            Self::Reset { .. } => "reset",
            Self::ConfigurationSaved { .. } => "configuration_saved",
            Self::LogLine { .. } => "log_line",
            Self::Fault { .. } => "fault",
            Self::Shutdown => "shutdown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_event_type_labels() {
        let doc = DocumentId::new("nb1");

        assert_eq!(EngineEvent::Shutdown.event_type(), "shutdown");
        assert_eq!(
            EngineEvent::PhaseChanged {
                old: DisplayedPhase::NotAttached,
                new: DisplayedPhase::Loading,
            }
            .event_type(),
            "phase_changed"
        );
        assert_eq!(
            EngineEvent::SessionCreated {
                document: doc.clone(),
                session_id: 1,
            }
            .event_type(),
            "session_created"
        );
        assert_eq!(
            EngineEvent::Fault {
                document: doc,
                error: "boom".to_string(),
            }
            .event_type(),
            "fault"
        );
        assert_eq!(EngineEvent::Reset { generation: 2 }.event_type(), "reset");
    }

    #[test]
    fn test_engine_event_clone() {
        let event = EngineEvent::ConfigurationSaved {
            document: DocumentId::new("nb1"),
            configuration: SavedConfiguration::default(),
        };
        assert_eq!(event.clone(), event);
    }
}
