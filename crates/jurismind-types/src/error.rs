use thiserror::Error;

/// Errors from repository operations (used by trait definitions in jurismind-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}

/// Failure of the generation gateway to produce text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("generation timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// The backend refused or failed the request; sending it again may work.
    #[error("generation backend rejected the request: {0}")]
    Rejected(String),

    /// The backend cannot serve this request as configured (auth, bad request).
    #[error("generation backend unavailable: {0}")]
    Unavailable(String),

    #[error("generation backend returned empty output")]
    EmptyOutput,
}

impl GenerationError {
    /// Whether a bounded retry is worth attempting.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::Timeout { .. } | GenerationError::Rejected(_)
        )
    }
}

/// A local check failed; nothing was sent to any gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionViolation {
    #[error("message is empty")]
    EmptyInput,

    #[error("no conversation is active")]
    NoActiveConversation,

    #[error("another operation is in flight")]
    Busy,

    #[error("conversation {0} is not in the list")]
    UnknownConversation(uuid::Uuid),

    #[error("conversation {0} belongs to another user")]
    ForeignConversation(uuid::Uuid),
}

/// Errors surfaced by the conversation session manager.
///
/// None of these are fatal: the slot returns to a usable state and the
/// error is shown as a transient notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Precondition(#[from] PreconditionViolation),

    #[error("failed to save: {0}")]
    StoreWrite(String),

    #[error("failed to load: {0}")]
    StoreRead(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl SessionError {
    pub fn store_write(err: impl std::fmt::Display) -> Self {
        SessionError::StoreWrite(err.to_string())
    }

    pub fn store_read(err: impl std::fmt::Display) -> Self {
        SessionError::StoreRead(err.to_string())
    }
}
