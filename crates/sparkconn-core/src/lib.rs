//! # sparkconn-core - Core Domain Types
//!
//! Foundation crate for the Spark connector. Provides domain types, error
//! handling, inbound comm message definitions, and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing, url).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`DocumentId`] - Stable key of one open document
//! - [`ConnectionStatus`] - Transport status of a document's backend process
//! - [`BackendStatus`] - Status the backend reports about itself
//! - [`SavedConfiguration`], [`SparkOption`] - Connection parameters persisted per document
//! - [`LogBuffer`] - Bounded buffer of streamed backend log lines
//!
//! ### Events (`events`)
//! - [`CommMessage`] - Typed inbound comm messages keyed by `msgtype`
//! - [`ChannelEvent`] - Raw message / close notifications from an open channel
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use sparkconn_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod logging;
pub mod prelude;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use events::{
    BundleDescriptor, ChannelEvent, CommMessage, ConnectError, ConnectedConfig, ConnectedInfo,
    FollowLog, OpenPage, OpenRequest,
};
pub use types::{
    BackendStatus, ConnectionStatus, DocumentId, LogBuffer, SavedConfiguration, SparkOption,
    DEFAULT_LOG_LINES,
};
