//! Persona roles and their display metadata.
//!
//! The role set is closed: every conversation is created under exactly one
//! of these personas and keeps it for its whole lifetime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Persona an actor chats as.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role_context IN ('lawyer', 'citizen', 'student'))`
///
/// Serializes as the lowercase slug. Deserialization goes through
/// [`FromStr`], so hand-edited files accept any casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Role {
    /// Legal professional.
    Lawyer,
    /// Member of the general public.
    Citizen,
    /// Law student.
    Student,
}

impl Role {
    /// Every role, in catalogue order.
    pub const ALL: [Role; 3] = [Role::Lawyer, Role::Citizen, Role::Student];

    /// Stable slug used in storage and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Lawyer => "lawyer",
            Role::Citizen => "citizen",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lawyer" => Ok(Role::Lawyer),
            "citizen" => Ok(Role::Citizen),
            "student" => Ok(Role::Student),
            other => Err(format!("invalid role: '{other}'")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Presentation data for a role (card title, blurb, feature list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleDisplayMetadata {
    pub title: &'static str,
    pub description: &'static str,
    pub features: &'static [&'static str],
    /// Theme key the presentation layer maps to an accent colour.
    pub accent: &'static str,
    /// Icon key the presentation layer maps to a glyph.
    pub icon: &'static str,
}
