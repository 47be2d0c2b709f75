//! # sparkconn-comm - Comm Channel Transport
//!
//! Opens per-document comm channels to the backend, parses inbound
//! `msgtype`-keyed messages, and builds outbound `action` envelopes.
//!
//! Depends on [`sparkconn_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Transport
//! - [`CommTransport`] - Opens a channel to a document's backend (async trait)
//! - [`LoopbackTransport`] - In-process transport whose backend is a [`BackendPeer`]
//!
//! ### Channels
//! - [`CommChannel`] - A freshly opened channel plus its inbound event stream
//! - [`ChannelHandle`] - Owner's handle; closing it stops inbound forwarding
//! - [`CommSender`] - Cloneable sender; `submit` queues actions in order
//! - [`write_queued()`] - Per-channel writer draining the submitted actions
//!
//! ### Protocol
//! - [`CommAction`] - Outbound `open` / `connect` / `disconnect` actions
//! - [`parse_comm_message()`] - Parse an inbound message into a [`CommMessage`]

pub mod channel;
pub mod commands;
pub mod protocol;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod transport;

// Public API re-exports
pub use channel::{next_channel_id, write_queued, ChannelHandle, ChannelId, CommChannel};
pub use commands::{CommAction, CommSender, QueuedAction};
pub use protocol::parse_comm_message;
pub use transport::{BackendPeer, CommTransport, LocalCommTransport, LoopbackTransport};

/// Re-exported from `sparkconn_core` for convenience. Canonical import: `sparkconn_core::CommMessage`.
pub use sparkconn_core::CommMessage;
