//! Registry of per-document sessions
//!
//! At most one session (and therefore one open channel) exists per document.
//! Channel opens in flight are tracked as tickets so a late acknowledgement
//! can be recognised and discarded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use sparkconn_comm::ChannelHandle;
use sparkconn_core::prelude::*;
use sparkconn_core::DocumentId;

use crate::session::{Session, SessionHandle};

/// Identifies one channel open request
pub type OpenTicket = u64;

static OPEN_TICKET_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_open_ticket() -> OpenTicket {
    OPEN_TICKET_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Maps documents to their session.
///
/// A backend-restart reset replaces the whole registry with a new one of the
/// next generation instead of clearing it in place.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    generation: u64,
    sessions: HashMap<DocumentId, SessionHandle>,
    pending: HashMap<DocumentId, OpenTicket>,
}

impl SessionRegistry {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            sessions: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Registry to replace this one on reset
    pub fn next_generation(&self) -> Self {
        Self::new(self.generation + 1)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reserve a channel open for `document`.
    ///
    /// Fails with [`Error::Invariant`] if a session or an open is already
    /// outstanding for it; callers must close the old one first.
    pub fn begin_create(&mut self, document: &DocumentId) -> Result<OpenTicket> {
        if self.sessions.contains_key(document) {
            return Err(Error::invariant(format!(
                "session already exists for {}",
                document
            )));
        }
        if self.pending.contains_key(document) {
            return Err(Error::invariant(format!(
                "channel open already pending for {}",
                document
            )));
        }

        let ticket = next_open_ticket();
        self.pending.insert(document.clone(), ticket);
        debug!("Opening channel for {} (ticket #{})", document, ticket);
        Ok(ticket)
    }

    /// True if `ticket` is the outstanding open for `document`
    pub fn is_pending(&self, document: &DocumentId, ticket: OpenTicket) -> bool {
        self.pending.get(document) == Some(&ticket)
    }

    pub fn has_pending(&self, document: &DocumentId) -> bool {
        self.pending.contains_key(document)
    }

    /// Drop a failed open. Returns `false` if the ticket was stale.
    pub fn abandon_open(&mut self, document: &DocumentId, ticket: OpenTicket) -> bool {
        if self.is_pending(document, ticket) {
            self.pending.remove(document);
            true
        } else {
            false
        }
    }

    /// Complete an acknowledged open.
    ///
    /// Returns the channel back if `ticket` is no longer the outstanding open.
    pub fn register(
        &mut self,
        ticket: OpenTicket,
        session: Session,
        channel: ChannelHandle,
    ) -> std::result::Result<&mut SessionHandle, ChannelHandle> {
        let document = session.document_id.clone();
        if !self.is_pending(&document, ticket) {
            return Err(channel);
        }
        self.pending.remove(&document);

        info!(
            "Session #{} registered for {} (channel #{})",
            session.id,
            document,
            channel.id()
        );
        let handle = self
            .sessions
            .entry(document)
            .or_insert(SessionHandle::new(session, channel));
        Ok(handle)
    }

    pub fn has(&self, document: &DocumentId) -> bool {
        self.sessions.contains_key(document)
    }

    pub fn get(&self, document: &DocumentId) -> Option<&SessionHandle> {
        self.sessions.get(document)
    }

    pub fn get_mut(&mut self, document: &DocumentId) -> Option<&mut SessionHandle> {
        self.sessions.get_mut(document)
    }

    /// Remove the entry for `document` without sending a teardown message.
    ///
    /// Also forgets any open in flight. Returns `true` if a session was removed.
    pub fn close(&mut self, document: &DocumentId) -> bool {
        self.pending.remove(document);
        match self.sessions.remove(document) {
            Some(handle) => {
                handle.close();
                info!("Session #{} for {} closed", handle.session.id, document);
                true
            }
            None => false,
        }
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.pending.clear();
        for (document, handle) in self.sessions.drain() {
            handle.close();
            debug!("Session #{} for {} discarded", handle.session.id, document);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Documents with a registered session
    pub fn documents(&self) -> impl Iterator<Item = &DocumentId> {
        self.sessions.keys()
    }
}
