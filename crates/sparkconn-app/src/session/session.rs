//! Per-document session state: phase objects and backend-status subscription.

use std::sync::{Arc, Weak};

use sparkconn_core::DocumentId;

use crate::host::Document;
use crate::phases::PhaseBundle;

use super::next_session_id;

/// Coordinator state bound to one document's open channel
#[derive(Debug)]
pub struct Session {
    /// Unique session identifier
    pub id: super::SessionId,

    pub document_id: DocumentId,

    /// Never keeps the document alive
    document: Weak<Document>,

    /// Phase objects, fresh for every session
    pub phases: PhaseBundle,

    /// Set once the backend reported `connected`; restarts then trigger a reset
    pub watching_backend: bool,
}

impl Session {
    pub fn new(document: &Arc<Document>, log_lines: usize) -> Self {
        Self {
            id: next_session_id(),
            document_id: document.id.clone(),
            document: Arc::downgrade(document),
            phases: PhaseBundle::new(log_lines),
            watching_backend: false,
        }
    }

    /// The document, if the host still has it open
    pub fn document(&self) -> Option<Arc<Document>> {
        self.document.upgrade()
    }

    /// Subscribe to the backend's own status. Returns `false` if already subscribed.
    pub fn watch_backend(&mut self) -> bool {
        !std::mem::replace(&mut self.watching_backend, true)
    }
}
