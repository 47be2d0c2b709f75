//! Per-document session state: the phase bundle plus its open channel

mod handle;
#[allow(clippy::module_inception)]
mod session;

pub use handle::SessionHandle;
pub use session::Session;

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a session
pub type SessionId = u64;

static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique session ID
pub fn next_session_id() -> SessionId {
    SESSION_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}
