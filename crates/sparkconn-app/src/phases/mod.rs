//! Phase objects and the displayed phase
//!
//! Each session owns a fresh [`PhaseBundle`]. Phase objects hold data and a
//! single user-action [`ActionSignal`]; they never talk to the backend.

mod configuring;
mod connect_failed;
mod connected;
mod connecting;

pub use configuring::ConfiguringPhase;
pub use connect_failed::ConnectFailedPhase;
pub use connected::ConnectedPhase;
pub use connecting::ConnectingPhase;

use std::fmt;
use std::marker::PhantomData;

use sparkconn_core::DocumentId;

// ─────────────────────────────────────────────────────────
// Action Signal
// ─────────────────────────────────────────────────────────

/// One-shot user-action notification owned by a phase instance.
///
/// The coordinator subscribes once per instance. Each `arm()` (done by the
/// phase's `init`) allows exactly one `fire()` to go through.
pub struct ActionSignal<T> {
    subscribed: bool,
    armed: bool,
    _payload: PhantomData<fn(T)>,
}

impl<T> Default for ActionSignal<T> {
    fn default() -> Self {
        Self {
            subscribed: false,
            armed: false,
            _payload: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ActionSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSignal")
            .field("subscribed", &self.subscribed)
            .field("armed", &self.armed)
            .finish()
    }
}

impl<T> ActionSignal<T> {
    /// Returns `false` if a subscriber was already attached
    pub fn subscribe(&mut self) -> bool {
        !std::mem::replace(&mut self.subscribed, true)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub(crate) fn arm(&mut self) {
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Deliver the action to the subscriber.
    ///
    /// Yields the payload at most once per arming, and only when subscribed.
    pub fn fire(&mut self, payload: T) -> Option<T> {
        if self.subscribed && std::mem::replace(&mut self.armed, false) {
            Some(payload)
        } else {
            None
        }
    }
}

// ─────────────────────────────────────────────────────────
// Phase Bundle
// ─────────────────────────────────────────────────────────

/// The four session-scoped phase objects, created fresh per session
#[derive(Debug)]
pub struct PhaseBundle {
    pub configuring: ConfiguringPhase,
    pub connecting: ConnectingPhase,
    pub connected: ConnectedPhase,
    pub connect_failed: ConnectFailedPhase,
}

impl PhaseBundle {
    /// `log_lines` bounds the Connecting and Connected log buffers
    pub fn new(log_lines: usize) -> Self {
        Self {
            configuring: ConfiguringPhase::default(),
            connecting: ConnectingPhase::new(log_lines),
            connected: ConnectedPhase::new(log_lines),
            connect_failed: ConnectFailedPhase::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Displayed Phase
// ─────────────────────────────────────────────────────────

/// Which phase is on screen. Exactly one at any time, for the focused document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DisplayedPhase {
    #[default]
    NotAttached,
    Loading,
    Configuring(DocumentId),
    Connecting(DocumentId),
    Connected(DocumentId),
    ConnectFailed(DocumentId),
}

/// Phase identity without its owner or data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseKind {
    NotAttached,
    Loading,
    Configuring,
    Connecting,
    Connected,
    ConnectFailed,
}

impl PhaseKind {
    fn name(self) -> &'static str {
        match self {
            Self::NotAttached => "not-attached",
            Self::Loading => "loading",
            Self::Configuring => "configuring",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::ConnectFailed => "connect-failed",
        }
    }
}

impl DisplayedPhase {
    fn kind(&self) -> PhaseKind {
        match self {
            Self::NotAttached => PhaseKind::NotAttached,
            Self::Loading => PhaseKind::Loading,
            Self::Configuring(_) => PhaseKind::Configuring,
            Self::Connecting(_) => PhaseKind::Connecting,
            Self::Connected(_) => PhaseKind::Connected,
            Self::ConnectFailed(_) => PhaseKind::ConnectFailed,
        }
    }

    /// Stable phase name
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Document whose session owns the phase, `None` for the singletons
    pub fn document(&self) -> Option<&DocumentId> {
        match self {
            Self::NotAttached | Self::Loading => None,
            Self::Configuring(d) | Self::Connecting(d) | Self::Connected(d) | Self::ConnectFailed(d) => {
                Some(d)
            }
        }
    }

    pub fn is_scoped_to(&self, document: &DocumentId) -> bool {
        self.document() == Some(document)
    }
}

impl fmt::Display for DisplayedPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.document() {
            Some(doc) => write!(f, "{}({})", self.name(), doc),
            None => f.write_str(self.name()),
        }
    }
}

/// Borrowed view of the displayed phase with its data
#[derive(Debug, Clone, Copy)]
pub enum PhaseView<'a> {
    NotAttached,
    Loading,
    Configuring(&'a ConfiguringPhase),
    Connecting(&'a ConnectingPhase),
    Connected(&'a ConnectedPhase),
    ConnectFailed(&'a ConnectFailedPhase),
}

impl<'a> PhaseView<'a> {
    /// Resolve a displayed phase against its session's bundle
    pub fn resolve(displayed: &DisplayedPhase, phases: Option<&'a PhaseBundle>) -> Self {
        match (displayed, phases) {
            (DisplayedPhase::NotAttached, _) => Self::NotAttached,
            (DisplayedPhase::Configuring(_), Some(p)) => Self::Configuring(&p.configuring),
            (DisplayedPhase::Connecting(_), Some(p)) => Self::Connecting(&p.connecting),
            (DisplayedPhase::Connected(_), Some(p)) => Self::Connected(&p.connected),
            (DisplayedPhase::ConnectFailed(_), Some(p)) => Self::ConnectFailed(&p.connect_failed),
            _ => Self::Loading,
        }
    }

    fn kind(&self) -> PhaseKind {
        match self {
            Self::NotAttached => PhaseKind::NotAttached,
            Self::Loading => PhaseKind::Loading,
            Self::Configuring(_) => PhaseKind::Configuring,
            Self::Connecting(_) => PhaseKind::Connecting,
            Self::Connected(_) => PhaseKind::Connected,
            Self::ConnectFailed(_) => PhaseKind::ConnectFailed,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Plain-text representation of the phase
    pub fn render(&self) -> String {
        match self {
            Self::NotAttached => "No document attached".to_string(),
            Self::Loading => "Loading...".to_string(),
            Self::Configuring(p) => p.render(),
            Self::Connecting(p) => p.render(),
            Self::Connected(p) => p.render(),
            Self::ConnectFailed(p) => p.render(),
        }
    }
}
