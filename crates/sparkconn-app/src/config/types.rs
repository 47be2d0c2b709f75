//! Configuration types for the Spark connector
//!
//! Defines:
//! - `Settings` - Global application settings
//! - Per-section settings structs

use serde::{Deserialize, Serialize};

use sparkconn_core::DEFAULT_LOG_LINES;

/// Global settings from `.sparkconn/config.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub comm: CommSettings,

    #[serde(default)]
    pub metadata: MetadataSettings,

    #[serde(default)]
    pub logs: LogSettings,

    #[serde(default)]
    pub engine: EngineSettings,
}

/// Comm channel settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommSettings {
    /// Comm target name registered by the backend
    #[serde(default = "default_target")]
    pub target: String,

    /// How long to wait for the backend to acknowledge a channel
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,
}

impl Default for CommSettings {
    fn default() -> Self {
        Self {
            target: default_target(),
            open_timeout_ms: default_open_timeout_ms(),
        }
    }
}

impl CommSettings {
    pub fn open_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.open_timeout_ms.max(1))
    }
}

fn default_target() -> String {
    "SparkConnector".to_string()
}

fn default_open_timeout_ms() -> u64 {
    10_000
}

/// Document metadata settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataSettings {
    /// Key the saved configuration is stored under
    #[serde(default = "default_metadata_key")]
    pub key: String,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            key: default_metadata_key(),
        }
    }
}

fn default_metadata_key() -> String {
    "sparkconnect".to_string()
}

/// Streamed backend log settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogSettings {
    /// Lines kept per phase; oldest lines are evicted
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
        }
    }
}

fn default_max_lines() -> usize {
    DEFAULT_LOG_LINES
}

/// Engine settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    /// Capacity of the engine's message channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    256
}
