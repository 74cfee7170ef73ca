//! ConversationStore trait definition.
//!
//! The record store gateway: list/insert/update over conversations and
//! their messages, scoped to the calling actor. Follows the same RPITIT
//! pattern as the other repository traits.
//!
//! Implementations do not retry. Timeouts and retry policy belong to the
//! caller (see [`crate::chat::session::SessionManager`]).

use jurismind_types::chat::{AuthorKind, Conversation, Turn};
use jurismind_types::error::RepositoryError;
use jurismind_types::role::Role;
use uuid::Uuid;

/// Repository trait for conversation and message persistence.
///
/// Implementations live in jurismind-infra (e.g., `SqliteConversationStore`).
/// The store assigns identifiers and timestamps.
pub trait ConversationStore: Send + Sync {
    /// List the owner's conversations, ordered by last activity DESC.
    ///
    /// An empty list is a valid result.
    fn list_conversations(
        &self,
        owner_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, RepositoryError>> + Send;

    /// Get a single conversation by ID.
    fn get_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// Create a conversation bound to `role` with the given placeholder title.
    fn create_conversation(
        &self,
        owner_id: &Uuid,
        role: Role,
        title: &str,
    ) -> impl std::future::Future<Output = Result<Conversation, RepositoryError>> + Send;

    /// Rewrite a conversation's title.
    fn update_conversation_title(
        &self,
        conversation_id: &Uuid,
        title: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List a conversation's messages, ordered by created_at ASC.
    fn list_messages(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Durably append a message and bump the conversation's last activity.
    fn append_message(
        &self,
        conversation_id: &Uuid,
        author_id: &Uuid,
        author: AuthorKind,
        content: &str,
    ) -> impl std::future::Future<Output = Result<Turn, RepositoryError>> + Send;
}
