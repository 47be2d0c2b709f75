//! Session handle - a session together with the channel it exists for.

use sparkconn_comm::{ChannelHandle, ChannelId, CommSender};

use super::session::Session;

/// A registered session and its open channel.
///
/// The channel is owned exclusively; dropping the handle closes it.
pub struct SessionHandle {
    /// The session state
    pub session: Session,

    /// The open comm channel
    channel: ChannelHandle,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session", &self.session)
            .field("channel_id", &self.channel.id())
            .field("channel_closed", &self.channel.is_closed())
            .finish()
    }
}

impl SessionHandle {
    pub fn new(session: Session, channel: ChannelHandle) -> Self {
        Self { session, channel }
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel.id()
    }

    /// Sender for background send tasks
    pub fn sender(&self) -> CommSender {
        self.channel.sender()
    }

    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    /// Close the channel locally, without a teardown message
    pub fn close(&self) {
        self.channel.close();
    }

    /// The backend side went away
    pub fn mark_closed(&self) {
        self.channel.mark_closed();
    }
}
