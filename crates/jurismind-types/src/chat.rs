//! Conversation and turn types for JurisMind.
//!
//! A conversation is one ongoing exchange owned by a single actor. Turns are
//! its utterances, ordered by creation time. In memory a turn is either
//! pending (optimistic, local only) or durable (confirmed by the store).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::role::Role;

/// Placeholder title given to a conversation before its first exchange.
pub const PLACEHOLDER_TITLE: &str = "New Conversation";

/// Who wrote a turn.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (author_kind IN ('user', 'assistant'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorKind {
    User,
    Assistant,
}

impl fmt::Display for AuthorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorKind::User => write!(f, "user"),
            AuthorKind::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for AuthorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(AuthorKind::User),
            "assistant" => Ok(AuthorKind::Assistant),
            other => Err(format!("invalid author kind: '{other}'")),
        }
    }
}

/// A conversation summary as held in the sidebar list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    /// Role the conversation was created under. Fixed for its lifetime.
    pub role_context: Role,
    pub created_at: DateTime<Utc>,
    /// Last-activity timestamp; the list is sorted on it, newest first.
    pub updated_at: DateTime<Utc>,
}

/// A durable turn, as confirmed by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub author: AuthorKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A turn shown before the store has confirmed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTurn {
    /// Local key, unique within one session. Never sent to the store.
    pub local_id: u64,
    pub author: AuthorKind,
    pub content: String,
    pub submitted_at: DateTime<Utc>,
}

/// One entry of the in-memory turn sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SessionTurn {
    Pending(PendingTurn),
    Durable(Turn),
}

impl SessionTurn {
    pub fn author(&self) -> AuthorKind {
        match self {
            SessionTurn::Pending(p) => p.author,
            SessionTurn::Durable(t) => t.author,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            SessionTurn::Pending(p) => &p.content,
            SessionTurn::Durable(t) => &t.content,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, SessionTurn::Pending(_))
    }

    /// The durable record, if the store has confirmed this turn.
    pub fn as_durable(&self) -> Option<&Turn> {
        match self {
            SessionTurn::Durable(t) => Some(t),
            SessionTurn::Pending(_) => None,
        }
    }
}

impl From<Turn> for SessionTurn {
    fn from(turn: Turn) -> Self {
        SessionTurn::Durable(turn)
    }
}
