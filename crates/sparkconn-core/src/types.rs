//! Core domain type definitions

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Default bound on streamed log lines kept per phase
pub const DEFAULT_LOG_LINES: usize = 1000;

// ─────────────────────────────────────────────────────────
// Document Identity
// ─────────────────────────────────────────────────────────

/// Opaque, stable key for one open document instance.
///
/// Cheap to clone; the host assigns it when the document opens and it lives
/// as long as the document does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Arc<str>);

impl DocumentId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

// ─────────────────────────────────────────────────────────
// Status Values
// ─────────────────────────────────────────────────────────

/// Transport connection status of a document's backend process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConnectionStatus {
    /// Transport is (re)establishing the backend connection
    Connecting,
    /// Backend process is reachable; channels may be opened
    Connected,
    /// Any other status the host reports (disconnected, dead, ...)
    Other(String),
}

impl ConnectionStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "connecting" => Self::Connecting,
            "connected" => Self::Connected,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Other(s) => s,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl From<String> for ConnectionStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ConnectionStatus> for String {
    fn from(value: ConnectionStatus) -> Self {
        value.as_str().to_string()
    }
}

/// Status the backend process reports about itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BackendStatus {
    Idle,
    Busy,
    Starting,
    Restarting,
    Dead,
    Other(String),
}

impl BackendStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "idle" => Self::Idle,
            "busy" => Self::Busy,
            "starting" => Self::Starting,
            "restarting" => Self::Restarting,
            "dead" => Self::Dead,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Starting => "starting",
            Self::Restarting => "restarting",
            Self::Dead => "dead",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for BackendStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<BackendStatus> for String {
    fn from(value: BackendStatus) -> Self {
        value.as_str().to_string()
    }
}

// ─────────────────────────────────────────────────────────
// Connection Parameters
// ─────────────────────────────────────────────────────────

/// A single `name = value` Spark option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparkOption {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl SparkOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Connection parameters the user last submitted for a document.
///
/// Stored in document metadata, so it outlives sessions and backend restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConfiguration {
    #[serde(default)]
    pub bundled_options: Vec<String>,
    #[serde(default)]
    pub list_of_options: Vec<SparkOption>,
}

impl SavedConfiguration {
    pub fn is_empty(&self) -> bool {
        self.bundled_options.is_empty() && self.list_of_options.is_empty()
    }
}

// ─────────────────────────────────────────────────────────
// Log Buffer
// ─────────────────────────────────────────────────────────

/// Fixed-capacity buffer of streamed backend log lines.
///
/// The oldest line is evicted once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_LINES)
    }
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Append a line, evicting the oldest if at capacity.
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Iterate over lines from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn latest(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_equality_and_display() {
        let a = DocumentId::new("notebooks/analysis.ipynb");
        let b: DocumentId = "notebooks/analysis.ipynb".into();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "notebooks/analysis.ipynb");
    }

    #[test]
    fn test_document_id_serializes_as_plain_string() {
        let id = DocumentId::new("nb1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"nb1\"");
        let back: DocumentId = serde_json::from_str("\"nb1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_connection_status_parse() {
        assert_eq!(
            ConnectionStatus::parse("connecting"),
            ConnectionStatus::Connecting
        );
        assert_eq!(
            ConnectionStatus::parse("connected"),
            ConnectionStatus::Connected
        );
        assert_eq!(
            ConnectionStatus::parse("disconnected"),
            ConnectionStatus::Other("disconnected".to_string())
        );
        assert!(ConnectionStatus::Connected.is_connected());
        assert!(!ConnectionStatus::Connecting.is_connected());
    }

    #[test]
    fn test_connection_status_from_json() {
        let status: ConnectionStatus = serde_json::from_str("\"connected\"").unwrap();
        assert_eq!(status, ConnectionStatus::Connected);
        let status: ConnectionStatus = serde_json::from_str("\"dead\"").unwrap();
        assert_eq!(status.as_str(), "dead");
    }

    #[test]
    fn test_backend_status_parse() {
        assert_eq!(BackendStatus::parse("restarting"), BackendStatus::Restarting);
        assert_eq!(BackendStatus::parse("idle"), BackendStatus::Idle);
        assert_eq!(
            BackendStatus::parse("autorestarting"),
            BackendStatus::Other("autorestarting".to_string())
        );
    }

    #[test]
    fn test_saved_configuration_defaults_missing_fields() {
        let cfg: SavedConfiguration =
            serde_json::from_str(r#"{"bundled_options": ["LongRunningAnalysis"]}"#).unwrap();
        assert_eq!(cfg.bundled_options, vec!["LongRunningAnalysis"]);
        assert!(cfg.list_of_options.is_empty());
        assert!(!cfg.is_empty());
        assert!(SavedConfiguration::default().is_empty());
    }

    #[test]
    fn test_log_buffer_evicts_oldest() {
        let mut buf = LogBuffer::new(2);
        buf.push("one");
        buf.push("two");
        buf.push("three");
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.iter().collect::<Vec<_>>(), vec!["two", "three"]);
        assert_eq!(buf.latest(), Some("three"));
    }

    #[test]
    fn test_log_buffer_zero_capacity_clamped() {
        let mut buf = LogBuffer::new(0);
        buf.push("only");
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.len(), 1);
    }
}
