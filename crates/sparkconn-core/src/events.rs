//! Comm channel event definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::SparkOption;

// ─────────────────────────────────────────────────────────
// Inbound Payloads
// ─────────────────────────────────────────────────────────

/// Page the backend asks the frontend to show in an `open` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OpenPage {
    /// Backend needs connection parameters
    Config,
    /// Reserved for authentication
    Auth,
    /// Backend is already connected
    Connected,
    Other(String),
}

impl OpenPage {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Config => "config",
            Self::Auth => "auth",
            Self::Connected => "connected",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for OpenPage {
    fn from(value: String) -> Self {
        match value.as_str() {
            "config" => Self::Config,
            "auth" => Self::Auth,
            "connected" => Self::Connected,
            _ => Self::Other(value),
        }
    }
}

impl From<OpenPage> for String {
    fn from(value: OpenPage) -> Self {
        value.as_str().to_string()
    }
}

/// A named bundle of Spark options offered by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleDescriptor {
    #[serde(default)]
    pub options: Vec<SparkOption>,
    /// Clusters this bundle applies to; empty means every cluster
    #[serde(default)]
    pub cluster_filter: Vec<String>,
}

impl BundleDescriptor {
    pub fn applies_to(&self, cluster: Option<&str>) -> bool {
        match cluster {
            Some(c) if !self.cluster_filter.is_empty() => self.cluster_filter.iter().any(|f| f == c),
            _ => true,
        }
    }
}

/// `open` - backend asks for a page, carrying limits and offered options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OpenRequest {
    pub page: OpenPage,
    #[serde(default, deserialize_with = "string_or_number")]
    pub maxmemory: Option<String>,
    #[serde(default)]
    pub sparkversion: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
    /// Option category -> option names
    #[serde(default)]
    pub availableoptions: BTreeMap<String, Vec<String>>,
    /// Bundle name -> bundle
    #[serde(default)]
    pub availablebundles: BTreeMap<String, BundleDescriptor>,
}

/// Configuration block of a `connected` message
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectedConfig {
    #[serde(default)]
    pub sparkhistoryserver: Option<String>,
}

/// `connected` - backend reports an active Spark session
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectedInfo {
    #[serde(default)]
    pub config: ConnectedConfig,
}

impl ConnectedInfo {
    /// History server location, if the backend sent a parsable URL
    pub fn history_server_url(&self) -> Option<url::Url> {
        self.config
            .sparkhistoryserver
            .as_deref()
            .and_then(|raw| url::Url::parse(raw).ok())
    }
}

/// `connect-error` - backend failed to start the Spark session
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectError {
    #[serde(default)]
    pub error: String,
}

/// `follow-log` - one streamed line of backend output
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FollowLog {
    pub msg: String,
}

// ─────────────────────────────────────────────────────────
// CommMessage Enum
// ─────────────────────────────────────────────────────────

/// Fully typed inbound comm message
#[derive(Debug, Clone, PartialEq)]
pub enum CommMessage {
    Open(OpenRequest),
    Connected(ConnectedInfo),
    ConnectError(ConnectError),
    FollowLog(FollowLog),

    // Fallback for unrecognized msgtype values
    Unknown {
        msgtype: String,
        payload: serde_json::Value,
    },
}

impl CommMessage {
    /// The wire `msgtype` of this message
    pub fn msgtype(&self) -> &str {
        match self {
            CommMessage::Open(_) => "open",
            CommMessage::Connected(_) => "connected",
            CommMessage::ConnectError(_) => "connect-error",
            CommMessage::FollowLog(_) => "follow-log",
            CommMessage::Unknown { msgtype, .. } => msgtype,
        }
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        match self {
            CommMessage::Open(open) => format!("Open page '{}'", open.page.as_str()),
            CommMessage::Connected(info) => match &info.config.sparkhistoryserver {
                Some(url) => format!("Connected (history server {})", url),
                None => "Connected".to_string(),
            },
            CommMessage::ConnectError(e) => format!("Connect error: {}", e.error),
            CommMessage::FollowLog(log) => log.msg.clone(),
            CommMessage::Unknown { msgtype, .. } => format!("Unknown message '{}'", msgtype),
        }
    }
}

// ─────────────────────────────────────────────────────────
// ChannelEvent (transport -> coordinator)
// ─────────────────────────────────────────────────────────

/// Event delivered by an open comm channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Raw JSON message from the backend
    Message(serde_json::Value),
    /// The channel closed (backend-initiated or transport loss)
    Closed,
}

/// Accept `"8g"`, `8` or `null` for limits the backend may send either way
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_open_request_accepts_numeric_maxmemory() {
        let open: OpenRequest =
            serde_json::from_value(json!({"page": "config", "maxmemory": 8})).unwrap();
        assert_eq!(open.maxmemory.as_deref(), Some("8"));
        assert_eq!(open.page, OpenPage::Config);
        assert!(open.availablebundles.is_empty());
    }

    #[test]
    fn test_open_request_rejects_object_maxmemory() {
        let res = serde_json::from_value::<OpenRequest>(
            json!({"page": "config", "maxmemory": {"gb": 8}}),
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_open_page_unknown_value_preserved() {
        let page: OpenPage = serde_json::from_value(json!("wizard")).unwrap();
        assert_eq!(page, OpenPage::Other("wizard".to_string()));
        assert_eq!(page.as_str(), "wizard");
    }

    #[test]
    fn test_bundle_cluster_filter() {
        let bundle = BundleDescriptor {
            options: vec![],
            cluster_filter: vec!["analytix".to_string()],
        };
        assert!(bundle.applies_to(Some("analytix")));
        assert!(!bundle.applies_to(Some("k8s")));
        assert!(bundle.applies_to(None));
        assert!(BundleDescriptor::default().applies_to(Some("k8s")));
    }

    #[test]
    fn test_history_server_url() {
        let info = ConnectedInfo {
            config: ConnectedConfig {
                sparkhistoryserver: Some("http://history.example:18080".to_string()),
            },
        };
        let url = info.history_server_url().unwrap();
        assert_eq!(url.host_str(), Some("history.example"));
        assert_eq!(url.port(), Some(18080));

        let info = ConnectedInfo {
            config: ConnectedConfig {
                sparkhistoryserver: Some("not a url".to_string()),
            },
        };
        assert!(info.history_server_url().is_none());
    }

    #[test]
    fn test_message_summaries() {
        let msg = CommMessage::ConnectError(ConnectError {
            error: "timeout".to_string(),
        });
        assert_eq!(msg.msgtype(), "connect-error");
        assert_eq!(msg.summary(), "Connect error: timeout");

        let msg = CommMessage::Unknown {
            msgtype: "bogus".to_string(),
            payload: json!({}),
        };
        assert_eq!(msg.msgtype(), "bogus");
    }
}
