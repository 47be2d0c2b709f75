//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Transport Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Failed to open comm channel: {reason}")]
    ChannelOpen { reason: String },

    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,

    // ─────────────────────────────────────────────────────────────
    // Protocol Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Comm protocol error: {message}")]
    Protocol { message: String },

    #[error("Unrecognized message type: {msgtype}")]
    UnknownMessageType { msgtype: String },

    // ─────────────────────────────────────────────────────────────
    // Backend-Reported Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Backend reported failure: {message}")]
    Backend { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration / Persistence Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Document metadata error: {message}")]
    Metadata { message: String },

    // ─────────────────────────────────────────────────────────────
    // Programming Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Invariant violated: {message}")]
    Invariant { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn channel_open(reason: impl Into<String>) -> Self {
        Self::ChannelOpen {
            reason: reason.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn unknown_message_type(msgtype: impl Into<String>) -> Self {
        Self::UnknownMessageType {
            msgtype: msgtype.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn metadata(message: impl Into<String>) -> Self {
        Self::Metadata {
            message: message.into(),
        }
    }

    /// Create an [`Error::Invariant`] for a broken programming contract.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Transport faults recover through the next connection-status event,
    /// backend-reported failures through the reconfigure action, and protocol
    /// faults leave the state untouched.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. }
                | Error::ChannelOpen { .. }
                | Error::ChannelSend { .. }
                | Error::ChannelClosed
                | Error::Protocol { .. }
                | Error::UnknownMessageType { .. }
                | Error::Backend { .. }
                | Error::Metadata { .. }
        )
    }

    /// Check if this error should trigger application exit
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Invariant { .. } | Error::Io(_))
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
