//! In-memory session state and its transitions.
//!
//! Every step of the session protocol is one synchronous method on
//! [`SessionState`]. Each method either applies fully or returns before
//! touching anything, and reports the [`SessionEvent`]s it caused. The
//! manager calls them under a lock that is never held across an await.

use chrono::{DateTime, Utc};
use jurismind_types::chat::{AuthorKind, Conversation, PendingTurn, SessionTurn, Turn};
use jurismind_types::error::{PreconditionViolation, SessionError};
use jurismind_types::role::Role;
use serde::Serialize;
use uuid::Uuid;

use super::events::SessionEvent;
use crate::llm::gateway::GenerationTurn;

/// Where the single conversation slot is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    /// No conversation is active.
    Idle,
    /// A list, select, or create call is in flight.
    Loading,
    /// A conversation is active and ready to send.
    Loaded,
    /// One send is in flight.
    Sending,
}

/// Consistent read model of the session, cloned out of the lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SlotState,
    pub conversations: Vec<Conversation>,
    pub active_conversation: Option<Conversation>,
    pub turns: Vec<SessionTurn>,
    pub sending: bool,
    #[serde(skip)]
    pub last_error: Option<SessionError>,
}

impl SessionSnapshot {
    /// Turns the store has confirmed, in order.
    pub fn durable_turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter_map(SessionTurn::as_durable)
    }
}

/// Why `begin_send` refused to start.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SendRefusal {
    /// A send is already in flight; the input is dropped without effect.
    InFlight,
    Precondition(PreconditionViolation),
}

/// Everything a send needs after its optimistic turn is in place.
#[derive(Debug, Clone)]
pub(crate) struct SendTicket {
    pub conversation_id: Uuid,
    pub role: Role,
    pub local_id: u64,
    pub content: String,
    /// No system turn existed in the conversation before this send.
    pub first_exchange: bool,
}

/// Undo instructions for an operation whose future was dropped mid-flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Abandon {
    List { previous: SlotState },
    Select,
    Create { previous: SlotState },
    Send { local_id: u64 },
}

#[derive(Debug)]
pub(crate) struct SessionState {
    slot: SlotState,
    conversations: Vec<Conversation>,
    active: Option<Uuid>,
    turns: Vec<SessionTurn>,
    last_error: Option<SessionError>,
    next_local_id: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            slot: SlotState::Idle,
            conversations: Vec::new(),
            active: None,
            turns: Vec::new(),
            last_error: None,
            next_local_id: 1,
        }
    }

    pub fn slot(&self) -> SlotState {
        self.slot
    }

    pub fn has_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_listed(&self, conversation_id: Uuid) -> bool {
        self.conversations.iter().any(|c| c.id == conversation_id)
    }

    pub fn most_recent(&self) -> Option<Uuid> {
        self.conversations.first().map(|c| c.id)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.slot,
            conversations: self.conversations.clone(),
            active_conversation: self.active_conversation().cloned(),
            turns: self.turns.clone(),
            sending: self.slot == SlotState::Sending,
            last_error: self.last_error.clone(),
        }
    }

    fn active_conversation(&self) -> Option<&Conversation> {
        let id = self.active?;
        self.conversations.iter().find(|c| c.id == id)
    }

    fn ensure_free(&self) -> Result<(), PreconditionViolation> {
        match self.slot {
            SlotState::Sending | SlotState::Loading => Err(PreconditionViolation::Busy),
            SlotState::Idle | SlotState::Loaded => Ok(()),
        }
    }

    fn idle_or_loaded(&self) -> SlotState {
        if self.active.is_some() {
            SlotState::Loaded
        } else {
            SlotState::Idle
        }
    }

    // ---------------------------------------------------------------------
    // Conversation list
    // ---------------------------------------------------------------------

    /// Claim the slot for a list fetch. Returns the state to go back to.
    pub fn begin_list(&mut self) -> Result<SlotState, PreconditionViolation> {
        self.ensure_free()?;
        let previous = self.slot;
        self.slot = SlotState::Loading;
        Ok(previous)
    }

    pub fn finish_list(
        &mut self,
        previous: SlotState,
        result: Result<Vec<Conversation>, SessionError>,
    ) -> Vec<SessionEvent> {
        self.slot = previous;
        match result {
            Ok(conversations) => {
                self.conversations = conversations;
                let mut events = vec![SessionEvent::ConversationsChanged];
                // A conversation that vanished from the list cannot stay active.
                if self.active.is_some() && self.active_conversation().is_none() {
                    self.active = None;
                    self.turns.clear();
                    self.slot = SlotState::Idle;
                    events.push(SessionEvent::ConversationSelected {
                        conversation_id: None,
                    });
                }
                events
            }
            Err(error) => self.raise(error),
        }
    }

    // ---------------------------------------------------------------------
    // Select
    // ---------------------------------------------------------------------

    /// Make `conversation_id` active and discard the current turns.
    pub fn begin_select(
        &mut self,
        conversation_id: Uuid,
    ) -> Result<Vec<SessionEvent>, PreconditionViolation> {
        self.ensure_free()?;
        if !self.is_listed(conversation_id) {
            return Err(PreconditionViolation::UnknownConversation(conversation_id));
        }
        self.slot = SlotState::Loading;
        self.active = Some(conversation_id);
        self.turns.clear();
        Ok(vec![
            SessionEvent::ConversationSelected {
                conversation_id: Some(conversation_id),
            },
            SessionEvent::TurnsChanged {
                conversation_id,
                len: 0,
            },
        ])
    }

    /// Install the fetched turns, or drop back to `Idle` if the fetch failed.
    pub fn finish_select(
        &mut self,
        conversation_id: Uuid,
        result: Result<Vec<Turn>, SessionError>,
    ) -> Vec<SessionEvent> {
        match result {
            Ok(turns) => {
                self.turns = turns.into_iter().map(SessionTurn::Durable).collect();
                self.slot = SlotState::Loaded;
                vec![SessionEvent::TurnsChanged {
                    conversation_id,
                    len: self.turns.len(),
                }]
            }
            Err(error) => {
                self.active = None;
                self.turns.clear();
                self.slot = SlotState::Idle;
                let mut events = vec![SessionEvent::ConversationSelected {
                    conversation_id: None,
                }];
                events.extend(self.raise(error));
                events
            }
        }
    }

    // ---------------------------------------------------------------------
    // Create
    // ---------------------------------------------------------------------

    pub fn begin_create(&mut self) -> Result<SlotState, PreconditionViolation> {
        self.ensure_free()?;
        let previous = self.slot;
        self.slot = SlotState::Loading;
        Ok(previous)
    }

    /// Prepend the new conversation and make it active with no turns.
    pub fn finish_create(
        &mut self,
        previous: SlotState,
        result: Result<Conversation, SessionError>,
    ) -> Vec<SessionEvent> {
        match result {
            Ok(conversation) => {
                let conversation_id = conversation.id;
                self.conversations.insert(0, conversation);
                self.active = Some(conversation_id);
                self.turns.clear();
                self.slot = SlotState::Loaded;
                vec![
                    SessionEvent::ConversationsChanged,
                    SessionEvent::ConversationSelected {
                        conversation_id: Some(conversation_id),
                    },
                    SessionEvent::TurnsChanged {
                        conversation_id,
                        len: 0,
                    },
                ]
            }
            Err(error) => {
                self.slot = previous;
                self.raise(error)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Send
    // ---------------------------------------------------------------------

    /// Validate the input, enter `Sending`, and show the optimistic turn.
    pub fn begin_send(
        &mut self,
        input: &str,
        now: DateTime<Utc>,
    ) -> Result<(SendTicket, Vec<SessionEvent>), SendRefusal> {
        match self.slot {
            SlotState::Sending => return Err(SendRefusal::InFlight),
            SlotState::Loading => {
                return Err(SendRefusal::Precondition(PreconditionViolation::Busy));
            }
            SlotState::Idle | SlotState::Loaded => {}
        }

        let content = input.trim();
        if content.is_empty() {
            return Err(SendRefusal::Precondition(PreconditionViolation::EmptyInput));
        }
        let conversation = self.active_conversation().ok_or(SendRefusal::Precondition(
            PreconditionViolation::NoActiveConversation,
        ))?;

        let conversation_id = conversation.id;
        let role = conversation.role_context;
        let first_exchange = !self
            .turns
            .iter()
            .any(|t| !t.is_pending() && t.author() == AuthorKind::Assistant);

        let local_id = self.next_local_id;
        self.next_local_id += 1;
        self.turns.push(SessionTurn::Pending(PendingTurn {
            local_id,
            author: AuthorKind::User,
            content: content.to_string(),
            submitted_at: now,
        }));
        self.slot = SlotState::Sending;

        let ticket = SendTicket {
            conversation_id,
            role,
            local_id,
            content: content.to_string(),
            first_exchange,
        };
        let events = vec![
            SessionEvent::SendingChanged { sending: true },
            SessionEvent::TurnsChanged {
                conversation_id,
                len: self.turns.len(),
            },
        ];
        Ok((ticket, events))
    }

    /// Replace the optimistic turn with its durable record, in place.
    pub fn reconcile(&mut self, local_id: u64, durable: Turn) -> Vec<SessionEvent> {
        let conversation_id = durable.conversation_id;
        let created_at = durable.created_at;
        match self.pending_position(local_id) {
            Some(index) => self.turns[index] = SessionTurn::Durable(durable),
            None => {
                tracing::warn!(local_id, "optimistic turn missing at reconcile, appending");
                self.turns.push(SessionTurn::Durable(durable));
            }
        }
        let mut events = vec![SessionEvent::TurnsChanged {
            conversation_id,
            len: self.turns.len(),
        }];
        events.extend(self.touch(conversation_id, created_at));
        events
    }

    /// Remove the optimistic turn. No-op if it is already gone.
    pub fn rollback(&mut self, local_id: u64) -> Vec<SessionEvent> {
        let Some(index) = self.pending_position(local_id) else {
            return Vec::new();
        };
        self.turns.remove(index);
        match self.active {
            Some(conversation_id) => vec![SessionEvent::TurnsChanged {
                conversation_id,
                len: self.turns.len(),
            }],
            None => Vec::new(),
        }
    }

    fn pending_position(&self, local_id: u64) -> Option<usize> {
        self.turns.iter().position(
            |t| matches!(t, SessionTurn::Pending(p) if p.local_id == local_id),
        )
    }

    /// The durable history to generate from. Optimistic turns are excluded.
    pub fn generation_history(&self) -> Vec<GenerationTurn> {
        self.turns
            .iter()
            .filter_map(SessionTurn::as_durable)
            .map(|t| GenerationTurn {
                author: t.author,
                content: t.content.clone(),
            })
            .collect()
    }

    /// Append the durable system turn.
    pub fn append_reply(&mut self, reply: Turn) -> Vec<SessionEvent> {
        let conversation_id = reply.conversation_id;
        let created_at = reply.created_at;
        self.turns.push(SessionTurn::Durable(reply));
        let mut events = vec![SessionEvent::TurnsChanged {
            conversation_id,
            len: self.turns.len(),
        }];
        events.extend(self.touch(conversation_id, created_at));
        events
    }

    /// Set the derived title on the in-memory summary.
    pub fn apply_title(&mut self, conversation_id: Uuid, title: &str) -> Vec<SessionEvent> {
        let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        else {
            return Vec::new();
        };
        conversation.title = title.to_string();
        vec![
            SessionEvent::TitleDerived {
                conversation_id,
                title: title.to_string(),
            },
            SessionEvent::ConversationsChanged,
        ]
    }

    /// Leave `Sending`, surfacing `error` if the send failed.
    pub fn finish_send(&mut self, error: Option<SessionError>) -> Vec<SessionEvent> {
        self.slot = self.idle_or_loaded();
        let mut events = vec![SessionEvent::SendingChanged { sending: false }];
        if let Some(error) = error {
            events.extend(self.raise(error));
        }
        events
    }

    // ---------------------------------------------------------------------
    // Misc
    // ---------------------------------------------------------------------

    /// Undo whatever an abandoned operation left behind.
    pub fn abandon(&mut self, abandon: Abandon) -> Vec<SessionEvent> {
        match abandon {
            Abandon::List { previous } | Abandon::Create { previous } => {
                self.slot = previous;
                Vec::new()
            }
            Abandon::Select => {
                self.active = None;
                self.turns.clear();
                self.slot = SlotState::Idle;
                vec![SessionEvent::ConversationSelected {
                    conversation_id: None,
                }]
            }
            Abandon::Send { local_id } => {
                let mut events = self.rollback(local_id);
                self.slot = self.idle_or_loaded();
                events.push(SessionEvent::SendingChanged { sending: false });
                events
            }
        }
    }

    pub fn clear_error(&mut self) -> bool {
        self.last_error.take().is_some()
    }

    pub fn raise(&mut self, error: SessionError) -> Vec<SessionEvent> {
        self.last_error = Some(error.clone());
        vec![SessionEvent::ErrorRaised { error }]
    }

    /// Move the conversation's last activity forward and keep the list
    /// sorted newest first.
    fn touch(&mut self, conversation_id: Uuid, at: DateTime<Utc>) -> Vec<SessionEvent> {
        let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        else {
            return Vec::new();
        };
        if at <= conversation.updated_at {
            return Vec::new();
        }
        conversation.updated_at = at;
        self.conversations
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        vec![SessionEvent::ConversationsChanged]
    }
}
