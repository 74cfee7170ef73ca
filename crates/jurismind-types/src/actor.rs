//! The authenticated actor driving a session.
//!
//! Identity is owned by an external collaborator; this crate only models the
//! value the session manager reads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;

/// The current user as seen by the conversation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    /// Display label (usually the sign-in email).
    pub label: String,
    /// Persona assigned to this actor. New conversations inherit it.
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, label: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            label: label.into(),
            role,
        }
    }
}
