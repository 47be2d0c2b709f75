//! Document host collaborators
//!
//! The host owns documents, tracks focus, and manages the backend process.
//! Focus, readiness and status changes reach the coordinator as
//! [`Message`](crate::message::Message)s; the operations below are the
//! requests the coordinator makes in return.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use sparkconn_core::prelude::*;
use sparkconn_core::{DocumentId, SavedConfiguration};

/// One open document as the host sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    /// Display name (usually the file name)
    pub name: String,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>) -> Self {
        let id = id.into();
        let name = id
            .as_str()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Self { id, name }
    }
}

// ─────────────────────────────────────────────────────────
// Backend Process Control
// ─────────────────────────────────────────────────────────

/// Backend process operations exposed by the document host.
///
/// Both resolve once the host finished the request. Connection status changes
/// caused by them arrive separately as messages.
#[trait_variant::make(DocumentHost: Send)]
pub trait LocalDocumentHost {
    /// Ask the transport to re-establish the backend connection
    async fn request_reconnect(&self, document: &DocumentId) -> Result<()>;

    /// Restart the backend process
    async fn request_restart(&self, document: &DocumentId) -> Result<()>;
}

// ─────────────────────────────────────────────────────────
// Document Metadata
// ─────────────────────────────────────────────────────────

/// Per-document key/value metadata that survives backend restarts
#[cfg_attr(test, mockall::automock)]
pub trait MetadataStore: Send + Sync {
    fn get(&self, document: &DocumentId, key: &str) -> Result<Option<Value>>;

    fn set(&self, document: &DocumentId, key: &str, value: Value) -> Result<()>;
}

/// Metadata kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    entries: Mutex<HashMap<(DocumentId, String), Value>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn get(&self, document: &DocumentId, key: &str) -> Result<Option<Value>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::metadata("metadata store lock poisoned"))?;
        Ok(entries.get(&(document.clone(), key.to_string())).cloned())
    }

    fn set(&self, document: &DocumentId, key: &str, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::metadata("metadata store lock poisoned"))?;
        entries.insert((document.clone(), key.to_string()), value);
        Ok(())
    }
}

/// Read the saved configuration for a document.
///
/// Absent or unreadable values yield an empty configuration.
pub fn load_saved_configuration(
    store: &dyn MetadataStore,
    document: &DocumentId,
    key: &str,
) -> SavedConfiguration {
    let value = match store.get(document, key) {
        Ok(Some(value)) => value,
        Ok(None) => return SavedConfiguration::default(),
        Err(e) => {
            warn!("Cannot read saved configuration for {}: {}", document, e);
            return SavedConfiguration::default();
        }
    };

    match serde_json::from_value(value) {
        Ok(config) => config,
        Err(e) => {
            warn!(
                "Ignoring unreadable saved configuration for {} ({}): {}",
                document, key, e
            );
            SavedConfiguration::default()
        }
    }
}

/// Overwrite the saved configuration for a document
pub fn store_saved_configuration(
    store: &dyn MetadataStore,
    document: &DocumentId,
    key: &str,
    config: &SavedConfiguration,
) -> Result<()> {
    let value = serde_json::to_value(config)?;
    store.set(document, key, value)
}
