//! Application state (Model in TEA pattern)

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sparkconn_core::{ConnectionStatus, DocumentId, SavedConfiguration};

use crate::config::Settings;
use crate::host::{Document, InMemoryMetadataStore, MetadataStore};
use crate::phases::{DisplayedPhase, PhaseView};
use crate::session_registry::SessionRegistry;

/// Last protocol or transport fault reported by the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub document: DocumentId,
    pub error: String,
}

/// Complete coordinator state
pub struct AppState {
    /// Loaded settings
    pub settings: Settings,

    /// Sessions by document; replaced wholesale on backend-restart reset
    pub registry: SessionRegistry,

    /// The single phase on screen
    pub displayed: DisplayedPhase,

    /// Currently focused document
    pub focused: Option<DocumentId>,

    /// Documents the host has open
    documents: HashMap<DocumentId, Arc<Document>>,

    /// Documents whose connection-status changes the coordinator acts on
    status_subscriptions: HashSet<DocumentId>,

    /// Last connection status reported per document
    known_status: HashMap<DocumentId, ConnectionStatus>,

    /// Documents whose backend session reported ready
    ready: HashSet<DocumentId>,

    /// Saved configuration storage
    pub metadata: Arc<dyn MetadataStore>,

    /// Bumped on every saved configuration
    pub saved_seq: u64,
    pub last_saved: Option<(DocumentId, SavedConfiguration)>,

    /// Bumped on every reported fault
    pub fault_seq: u64,
    pub last_fault: Option<Fault>,

    /// Bumped on every backend log line shown
    pub log_seq: u64,
    pub last_log: Option<(DocumentId, String)>,

    quit: bool,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("displayed", &self.displayed)
            .field("focused", &self.focused)
            .field("registry", &self.registry)
            .field("status_subscriptions", &self.status_subscriptions)
            .field("known_status", &self.known_status)
            .field("ready", &self.ready)
            .field("quit", &self.quit)
            .finish()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_settings(Settings::default(), Arc::new(InMemoryMetadataStore::new()))
    }

    pub fn with_settings(settings: Settings, metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            settings,
            registry: SessionRegistry::new(0),
            displayed: DisplayedPhase::NotAttached,
            focused: None,
            documents: HashMap::new(),
            status_subscriptions: HashSet::new(),
            known_status: HashMap::new(),
            ready: HashSet::new(),
            metadata,
            saved_seq: 0,
            last_saved: None,
            fault_seq: 0,
            last_fault: None,
            log_seq: 0,
            last_log: None,
            quit: false,
        }
    }

    // ─────────────────────────────────────────────────────────
    // Display
    // ─────────────────────────────────────────────────────────

    pub fn display(&mut self, phase: DisplayedPhase) {
        if self.displayed != phase {
            tracing::debug!("Phase: {} -> {}", self.displayed, phase);
            self.displayed = phase;
        }
    }

    /// The displayed phase with its data
    pub fn view(&self) -> PhaseView<'_> {
        let phases = self
            .displayed
            .document()
            .and_then(|doc| self.registry.get(doc))
            .map(|handle| &handle.session.phases);
        PhaseView::resolve(&self.displayed, phases)
    }

    // ─────────────────────────────────────────────────────────
    // Focus
    // ─────────────────────────────────────────────────────────

    /// True iff `document` is the focused document
    pub fn focus_allowed(&self, document: &DocumentId) -> bool {
        self.focused.as_ref() == Some(document)
    }

    pub fn subscribe_status(&mut self, document: &DocumentId) -> bool {
        self.status_subscriptions.insert(document.clone())
    }

    pub fn is_status_subscribed(&self, document: &DocumentId) -> bool {
        self.status_subscriptions.contains(document)
    }

    pub(crate) fn clear_status_subscriptions(&mut self) {
        self.status_subscriptions.clear();
    }

    // ─────────────────────────────────────────────────────────
    // Host Facts
    // ─────────────────────────────────────────────────────────

    /// The host document for `id`, registered on first sight
    pub fn ensure_document(&mut self, id: &DocumentId) -> Arc<Document> {
        self.documents
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Document::new(id.clone())))
            .clone()
    }

    pub fn document(&self, id: &DocumentId) -> Option<&Arc<Document>> {
        self.documents.get(id)
    }

    /// Forget everything known about a closed document
    pub(crate) fn forget_document(&mut self, id: &DocumentId) {
        self.documents.remove(id);
        self.status_subscriptions.remove(id);
        self.known_status.remove(id);
        self.ready.remove(id);
    }

    pub fn set_status(&mut self, document: &DocumentId, status: ConnectionStatus) {
        self.known_status.insert(document.clone(), status);
    }

    pub fn status(&self, document: &DocumentId) -> Option<&ConnectionStatus> {
        self.known_status.get(document)
    }

    pub fn mark_ready(&mut self, document: &DocumentId) {
        self.ready.insert(document.clone());
    }

    pub fn is_ready(&self, document: &DocumentId) -> bool {
        self.ready.contains(document)
    }

    // ─────────────────────────────────────────────────────────
    // Reporting
    // ─────────────────────────────────────────────────────────

    pub fn record_fault(&mut self, document: &DocumentId, error: impl Into<String>) {
        self.fault_seq += 1;
        self.last_fault = Some(Fault {
            document: document.clone(),
            error: error.into(),
        });
    }

    pub fn record_saved(&mut self, document: &DocumentId, config: SavedConfiguration) {
        self.saved_seq += 1;
        self.last_saved = Some((document.clone(), config));
    }

    pub fn record_log(&mut self, document: &DocumentId, line: impl Into<String>) {
        self.log_seq += 1;
        self.last_log = Some((document.clone(), line.into()));
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }
}
