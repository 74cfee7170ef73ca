//! Broadcast bus for session change notifications.
//!
//! The session manager publishes one event per applied step so a UI can
//! re-read the snapshot. Publishing with no active subscribers is a no-op.

use jurismind_types::error::SessionError;
use tokio::sync::broadcast;
use uuid::Uuid;

/// What changed in the session after a step was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The conversation list was replaced, extended, or reordered.
    ConversationsChanged,
    /// The active conversation changed. `None` means no conversation is active.
    ConversationSelected { conversation_id: Option<Uuid> },
    /// The active turn sequence changed.
    TurnsChanged { conversation_id: Uuid, len: usize },
    SendingChanged { sending: bool },
    TitleDerived { conversation_id: Uuid, title: String },
    /// A transient notification was raised.
    ErrorRaised { error: SessionError },
}

/// Multi-consumer bus for [`SessionEvent`]s.
pub struct SessionEventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = SessionEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

impl Clone for SessionEventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for SessionEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
