//! Conversation session manager.
//!
//! Owns the in-memory view of the actor's conversation list and of the one
//! active conversation's turns, and runs the send protocol against the
//! record store and the generation gateway:
//!
//! 1. validate the input and claim the slot (`Sending`)
//! 2. show an optimistic user turn
//! 3. persist the user turn, or roll the optimistic turn back
//! 4. reconcile the optimistic turn with the durable record in place
//! 5. build the request from the durable history and the conversation's directive
//! 6. generate (bounded, with optional retry)
//! 7. persist the system turn
//! 8. append it to the sequence
//! 9. on the conversation's first exchange, derive and persist its title
//! 10. release the slot
//!
//! A single slot serves the whole manager. While a send, select, create, or
//! list call is in flight, other state-changing calls are refused, so two
//! operations never interleave their writes to the turn sequence.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use jurismind_types::actor::Actor;
use jurismind_types::chat::{AuthorKind, Conversation, PLACEHOLDER_TITLE, Turn};
use jurismind_types::config::GlobalConfig;
use jurismind_types::error::{
    GenerationError, PreconditionViolation, RepositoryError, SessionError,
};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{SessionEvent, SessionEventBus};
use super::repository::ConversationStore;
use super::state::{Abandon, SendRefusal, SendTicket, SessionSnapshot, SessionState};
use super::title::derive_title;
use crate::llm::gateway::{GeneratedText, GenerationGateway, GenerationRequest};
use crate::llm::retry::RetryPolicy;
use crate::role;

/// Default capacity of the session event channel.
const EVENT_CAPACITY: usize = 256;

/// Tunables for a [`SessionManager`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Maximum characters of a derived title, marker included.
    pub title_cap: usize,
    /// Upper bound on every record store call.
    pub store_timeout: Duration,
    /// Retry schedule for the generation call.
    pub retry: RetryPolicy,
}

impl SessionSettings {
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            title_cap: config.title_cap,
            store_timeout: Duration::from_secs(config.store_timeout_secs),
            retry: RetryPolicy::from(&config.generation.retry),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&GlobalConfig::default())
    }
}

/// Result of [`SessionManager::submit_turn`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Both turns are durable and appended.
    Completed {
        user_turn: Turn,
        reply: Turn,
        /// The title derived by this send, if it was the first exchange and
        /// the title was saved.
        title: Option<String>,
    },
    /// A send was already in flight. Nothing changed.
    Ignored,
}

#[derive(Debug, Clone, Copy)]
enum StoreCall {
    Read,
    Write,
}

impl StoreCall {
    fn error(self, cause: impl std::fmt::Display) -> SessionError {
        match self {
            StoreCall::Read => SessionError::store_read(cause),
            StoreCall::Write => SessionError::store_write(cause),
        }
    }
}

/// Undoes an operation's local effects if its future is dropped before it
/// finishes.
struct InFlight<'a> {
    state: &'a Mutex<SessionState>,
    events: &'a SessionEventBus,
    abandon: Option<Abandon>,
}

impl InFlight<'_> {
    fn disarm(mut self) {
        self.abandon = None;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(abandon) = self.abandon.take() {
            tracing::debug!(?abandon, "operation dropped mid-flight, undoing local state");
            let events = self
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .abandon(abandon);
            self.events.publish_all(events);
        }
    }
}

/// Coordinates one UI session for one actor.
///
/// All methods take `&self`; the state lives behind a lock that is only
/// held for the synchronous transitions between awaits, so
/// [`snapshot`](Self::snapshot) is safe to call at any time and never sees a
/// half-applied step.
pub struct SessionManager<S, G> {
    actor: Actor,
    store: Arc<S>,
    generator: Arc<G>,
    settings: SessionSettings,
    state: Mutex<SessionState>,
    events: SessionEventBus,
}

impl<S: ConversationStore, G: GenerationGateway> SessionManager<S, G> {
    pub fn new(actor: Actor, store: Arc<S>, generator: Arc<G>, settings: SessionSettings) -> Self {
        Self {
            actor,
            store,
            generator,
            settings,
            state: Mutex::new(SessionState::new()),
            events: SessionEventBus::new(EVENT_CAPACITY),
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Current state, conversations, active turns, and last error.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.apply(|s| s.snapshot())
    }

    /// Receive a [`SessionEvent`] after every applied step.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Dismiss the transient error notification.
    pub fn clear_error(&self) {
        self.apply(SessionState::clear_error);
    }

    /// Fetch the actor's conversations and, if none is active yet, open the
    /// most recent one.
    #[tracing::instrument(skip(self), fields(owner_id = %self.actor.id))]
    pub async fn load_conversations(&self) -> Result<(), SessionError> {
        self.refresh_conversations().await?;

        let target = self.apply(|s| if s.has_active() { None } else { s.most_recent() });
        if let Some(conversation_id) = target {
            self.select_conversation(conversation_id).await?;
        }
        Ok(())
    }

    /// Re-read the actor's conversation list, newest activity first.
    pub async fn refresh_conversations(&self) -> Result<(), SessionError> {
        let previous = self.apply(SessionState::begin_list)?;
        let guard = self.in_flight(Abandon::List { previous });

        let result = self
            .store_call(StoreCall::Read, self.store.list_conversations(&self.actor.id))
            .await;
        guard.disarm();

        match &result {
            Ok(list) => tracing::debug!(count = list.len(), "conversations loaded"),
            Err(e) => tracing::warn!(error = %e, "failed to list conversations"),
        }
        let error = result.as_ref().err().cloned();
        self.apply_events(|s| s.finish_list(previous, result));
        error.map_or(Ok(()), Err)
    }

    /// Make `conversation_id` active and fetch its turns fresh.
    ///
    /// The current turn sequence is discarded first. Refused with
    /// `Busy` while any other operation is in flight.
    #[tracing::instrument(skip(self), fields(conversation_id = %conversation_id))]
    pub async fn select_conversation(&self, conversation_id: Uuid) -> Result<(), SessionError> {
        let events = self.apply(|s| s.begin_select(conversation_id))?;
        self.events.publish_all(events);
        let guard = self.in_flight(Abandon::Select);

        let result = self
            .store_call(StoreCall::Read, self.store.list_messages(&conversation_id))
            .await;
        guard.disarm();

        match &result {
            Ok(turns) => tracing::debug!(turns = turns.len(), "conversation loaded"),
            Err(e) => tracing::warn!(error = %e, "failed to load conversation"),
        }
        let error = result.as_ref().err().cloned();
        self.apply_events(|s| s.finish_select(conversation_id, result));
        error.map_or(Ok(()), Err)
    }

    /// Open a conversation named by id from outside the list, such as a
    /// command-line argument.
    ///
    /// A listed id is selected directly. Otherwise the store is asked for
    /// the record: a missing id or one owned by another actor is refused,
    /// and an id the list has not caught up with yet triggers a refresh
    /// before selecting.
    #[tracing::instrument(skip(self), fields(conversation_id = %conversation_id))]
    pub async fn open_conversation(&self, conversation_id: Uuid) -> Result<(), SessionError> {
        if !self.apply(|s| s.is_listed(conversation_id)) {
            let record = match self
                .store_call(StoreCall::Read, self.store.get_conversation(&conversation_id))
                .await
            {
                Ok(record) => record,
                Err(error) => {
                    tracing::warn!(error = %error, "failed to look up conversation");
                    self.apply_events(|s| s.raise(error.clone()));
                    return Err(error);
                }
            };
            match record {
                None => {
                    return Err(PreconditionViolation::UnknownConversation(conversation_id).into());
                }
                Some(conversation) if conversation.owner_id != self.actor.id => {
                    tracing::warn!(owner_id = %conversation.owner_id, "conversation owned by another actor");
                    return Err(PreconditionViolation::ForeignConversation(conversation_id).into());
                }
                Some(_) => self.refresh_conversations().await?,
            }
        }
        self.select_conversation(conversation_id).await
    }

    /// Create a conversation under the actor's current role and make it
    /// active with an empty turn sequence.
    #[tracing::instrument(skip(self), fields(role = %self.actor.role))]
    pub async fn create_conversation(&self) -> Result<Conversation, SessionError> {
        let previous = self.apply(SessionState::begin_create)?;
        let guard = self.in_flight(Abandon::Create { previous });

        let result = self
            .store_call(
                StoreCall::Write,
                self.store
                    .create_conversation(&self.actor.id, self.actor.role, PLACEHOLDER_TITLE),
            )
            .await;
        guard.disarm();

        match &result {
            Ok(c) => tracing::info!(conversation_id = %c.id, "conversation created"),
            Err(e) => tracing::warn!(error = %e, "failed to create conversation"),
        }
        let outcome = result.clone();
        self.apply_events(|s| s.finish_create(previous, result));
        outcome
    }

    /// Send `input` as a user turn and append the generated reply.
    ///
    /// Returns [`SubmitOutcome::Ignored`] without any effect while another
    /// send is in flight. Precondition failures are returned and never reach
    /// a gateway. Store and generation failures are also recorded as the
    /// session's last error.
    #[tracing::instrument(skip(self, input), fields(conversation_id = tracing::field::Empty))]
    pub async fn submit_turn(&self, input: &str) -> Result<SubmitOutcome, SessionError> {
        let ticket = match self.apply(|s| s.begin_send(input, Utc::now())) {
            Ok((ticket, events)) => {
                self.events.publish_all(events);
                ticket
            }
            Err(SendRefusal::InFlight) => {
                tracing::debug!("send already in flight, input ignored");
                return Ok(SubmitOutcome::Ignored);
            }
            Err(SendRefusal::Precondition(violation)) => return Err(violation.into()),
        };
        tracing::Span::current().record(
            "conversation_id",
            tracing::field::display(ticket.conversation_id),
        );
        let guard = self.in_flight(Abandon::Send {
            local_id: ticket.local_id,
        });

        // The user turn must be durable before generation runs.
        let user_turn = match self
            .append(&ticket, AuthorKind::User, &ticket.content)
            .await
        {
            Ok(turn) => turn,
            Err(error) => {
                tracing::warn!(error = %error, "user turn not saved, rolling back");
                guard.disarm();
                self.apply_events(|s| {
                    let mut events = s.rollback(ticket.local_id);
                    events.extend(s.finish_send(Some(error.clone())));
                    events
                });
                return Err(error);
            }
        };
        tracing::debug!(turn_id = %user_turn.id, "user turn saved");

        let history = self.apply(|s| {
            let events = s.reconcile(ticket.local_id, user_turn.clone());
            (events, s.generation_history())
        });
        self.events.publish_all(history.0);
        let request = GenerationRequest {
            turns: history.1,
            directive: role::directive_for(ticket.role).to_string(),
        };

        let generated = match self.generate(&request).await {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(error = %error, "generation failed, user turn kept");
                return Err(self.fail_send(guard, error.into()));
            }
        };

        let reply = match self
            .append(&ticket, AuthorKind::Assistant, &generated.into_inner())
            .await
        {
            Ok(turn) => turn,
            Err(error) => {
                tracing::warn!(error = %error, "reply not saved");
                return Err(self.fail_send(guard, error));
            }
        };
        tracing::debug!(turn_id = %reply.id, "reply saved");
        self.apply_events(|s| s.append_reply(reply.clone()));

        let mut title = None;
        let mut title_error = None;
        if ticket.first_exchange {
            match self.save_title(&ticket).await {
                Ok(derived) => title = Some(derived),
                Err(error) => title_error = Some(error),
            }
        }

        guard.disarm();
        self.apply_events(|s| s.finish_send(title_error));
        Ok(SubmitOutcome::Completed {
            user_turn,
            reply,
            title,
        })
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedText, GenerationError> {
        let generator = &self.generator;
        self.settings
            .retry
            .run(|attempt| {
                tracing::debug!(attempt, turns = request.turns.len(), "requesting generation");
                generator.generate(request)
            })
            .await
    }

    async fn append(
        &self,
        ticket: &SendTicket,
        author: AuthorKind,
        content: &str,
    ) -> Result<Turn, SessionError> {
        self.store_call(
            StoreCall::Write,
            self.store
                .append_message(&ticket.conversation_id, &self.actor.id, author, content),
        )
        .await
    }

    async fn save_title(&self, ticket: &SendTicket) -> Result<String, SessionError> {
        let derived = derive_title(&ticket.content, self.settings.title_cap);
        match self
            .store_call(
                StoreCall::Write,
                self.store
                    .update_conversation_title(&ticket.conversation_id, &derived),
            )
            .await
        {
            Ok(()) => {
                tracing::info!(title = %derived, "conversation titled");
                self.apply_events(|s| s.apply_title(ticket.conversation_id, &derived));
                Ok(derived)
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to save conversation title");
                Err(error)
            }
        }
    }

    /// Leave `Sending` with `error` surfaced, keeping durable turns.
    fn fail_send(&self, guard: InFlight<'_>, error: SessionError) -> SessionError {
        guard.disarm();
        self.apply_events(|s| s.finish_send(Some(error.clone())));
        error
    }

    async fn store_call<T>(
        &self,
        call: StoreCall,
        fut: impl Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, SessionError> {
        match tokio::time::timeout(self.settings.store_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(call.error(e)),
            Err(_) => Err(call.error(format!(
                "timed out after {:?}",
                self.settings.store_timeout
            ))),
        }
    }

    fn in_flight(&self, abandon: Abandon) -> InFlight<'_> {
        InFlight {
            state: &self.state,
            events: &self.events,
            abandon: Some(abandon),
        }
    }

    fn apply<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    fn apply_events(&self, f: impl FnOnce(&mut SessionState) -> Vec<SessionEvent>) {
        let events = self.apply(f);
        self.events.publish_all(events);
    }
}

impl<S, G> std::fmt::Debug for SessionManager<S, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("actor", &self.actor.id)
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::state::SlotState;
    use chrono::DateTime;
    use jurismind_types::chat::SessionTurn;
    use jurismind_types::error::PreconditionViolation;
    use jurismind_types::role::Role;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    // -----------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------

    /// Holds a call until the test releases it.
    #[derive(Default)]
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    impl Gate {
        async fn pass(&self) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }

    #[derive(Default)]
    struct MockStore {
        conversations: Mutex<Vec<Conversation>>,
        messages: Mutex<Vec<Turn>>,
        title_calls: AtomicUsize,
        clock: AtomicI64,
        fail_append: Mutex<Option<AuthorKind>>,
        fail_title: AtomicBool,
        fail_list_messages: AtomicBool,
        fail_list_conversations: AtomicBool,
        fail_create: AtomicBool,
        fail_get: AtomicBool,
        hang_append: AtomicBool,
        list_messages_gate: Option<Arc<Gate>>,
        list_conversations_gate: Option<Arc<Gate>>,
        create_gate: Option<Arc<Gate>>,
    }

    impl MockStore {
        /// Strictly increasing timestamps, one millisecond apart.
        fn tick(&self) -> DateTime<Utc> {
            let n = self.clock.fetch_add(1, Ordering::SeqCst);
            DateTime::from_timestamp_millis(1_750_000_000_000 + n).unwrap()
        }

        fn seed_conversation(&self, owner_id: Uuid, role: Role, title: &str) -> Conversation {
            let at = self.tick();
            let conversation = Conversation {
                id: Uuid::now_v7(),
                owner_id,
                title: title.to_string(),
                role_context: role,
                created_at: at,
                updated_at: at,
            };
            self.conversations.lock().unwrap().push(conversation.clone());
            conversation
        }

        fn seed_turn(&self, conversation_id: Uuid, author: AuthorKind, content: &str) -> Turn {
            let turn = Turn {
                id: Uuid::now_v7(),
                conversation_id,
                author,
                content: content.to_string(),
                created_at: self.tick(),
            };
            self.messages.lock().unwrap().push(turn.clone());
            turn
        }

        fn stored_turns(&self, conversation_id: Uuid) -> Vec<Turn> {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.conversation_id == conversation_id)
                .cloned()
                .collect()
        }

        fn title_of(&self, conversation_id: Uuid) -> String {
            self.conversations
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == conversation_id)
                .map(|c| c.title.clone())
                .unwrap()
        }
    }

    impl ConversationStore for MockStore {
        async fn list_conversations(&self, owner_id: &Uuid) -> Result<Vec<Conversation>, RepositoryError> {
            if let Some(gate) = &self.list_conversations_gate {
                gate.pass().await;
            }
            if self.fail_list_conversations.load(Ordering::SeqCst) {
                return Err(RepositoryError::Connection);
            }
            let mut list: Vec<_> = self
                .conversations
                .lock()
                .unwrap()
                .iter()
                .filter(|c| &c.owner_id == owner_id)
                .cloned()
                .collect();
            list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(list)
        }

        async fn get_conversation(&self, conversation_id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
            if self.fail_get.load(Ordering::SeqCst) {
                return Err(RepositoryError::Connection);
            }
            Ok(self
                .conversations
                .lock()
                .unwrap()
                .iter()
                .find(|c| &c.id == conversation_id)
                .cloned())
        }

        async fn create_conversation(
            &self,
            owner_id: &Uuid,
            role: Role,
            title: &str,
        ) -> Result<Conversation, RepositoryError> {
            if let Some(gate) = &self.create_gate {
                gate.pass().await;
            }
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(RepositoryError::Query("insert rejected".to_string()));
            }
            Ok(self.seed_conversation(*owner_id, role, title))
        }

        async fn update_conversation_title(&self, conversation_id: &Uuid, title: &str) -> Result<(), RepositoryError> {
            self.title_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_title.load(Ordering::SeqCst) {
                return Err(RepositoryError::Query("title rejected".to_string()));
            }
            let mut conversations = self.conversations.lock().unwrap();
            let conversation = conversations
                .iter_mut()
                .find(|c| &c.id == conversation_id)
                .ok_or(RepositoryError::NotFound)?;
            conversation.title = title.to_string();
            Ok(())
        }

        async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<Turn>, RepositoryError> {
            if let Some(gate) = &self.list_messages_gate {
                gate.pass().await;
            }
            if self.fail_list_messages.load(Ordering::SeqCst) {
                return Err(RepositoryError::Connection);
            }
            Ok(self.stored_turns(*conversation_id))
        }

        async fn append_message(
            &self,
            conversation_id: &Uuid,
            _author_id: &Uuid,
            author: AuthorKind,
            content: &str,
        ) -> Result<Turn, RepositoryError> {
            if self.hang_append.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if *self.fail_append.lock().unwrap() == Some(author) {
                return Err(RepositoryError::Query("insert rejected".to_string()));
            }
            let turn = self.seed_turn(*conversation_id, author, content);
            if let Some(c) = self
                .conversations
                .lock()
                .unwrap()
                .iter_mut()
                .find(|c| &c.id == conversation_id)
            {
                c.updated_at = turn.created_at;
            }
            Ok(turn)
        }
    }

    #[derive(Default)]
    struct MockGenerator {
        replies: Mutex<VecDeque<Result<String, GenerationError>>>,
        requests: Mutex<Vec<GenerationRequest>>,
        gate: Option<Arc<Gate>>,
    }

    impl MockGenerator {
        fn replying(replies: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            }
        }

        fn gated(gate: Arc<Gate>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::default()
            }
        }

        fn requests(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl GenerationGateway for MockGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedText, GenerationError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.pass().await;
            }
            let next = self.replies.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok("Here is some general guidance.".to_string()))
                .map(GeneratedText)
        }
    }

    type Manager = SessionManager<MockStore, MockGenerator>;

    fn actor(role: Role) -> Actor {
        Actor::new(Uuid::now_v7(), "Rahima", role)
    }

    fn build(
        actor: Actor,
        store: MockStore,
        generator: MockGenerator,
        settings: SessionSettings,
    ) -> (Arc<Manager>, Arc<MockStore>, Arc<MockGenerator>) {
        let store = Arc::new(store);
        let generator = Arc::new(generator);
        let manager = Arc::new(SessionManager::new(
            actor,
            store.clone(),
            generator.clone(),
            settings,
        ));
        (manager, store, generator)
    }

    /// Manager with one empty conversation created and active.
    async fn with_empty_conversation(
        role: Role,
        generator: MockGenerator,
    ) -> (Arc<Manager>, Arc<MockStore>, Arc<MockGenerator>, Uuid) {
        let (manager, store, generator) =
            build(actor(role), MockStore::default(), generator, SessionSettings::default());
        let conversation = manager.create_conversation().await.unwrap();
        (manager, store, generator, conversation.id)
    }

    fn durable(snapshot: &SessionSnapshot) -> Vec<Turn> {
        snapshot.durable_turns().cloned().collect()
    }

    // -----------------------------------------------------------------
    // Loading, selecting, creating
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn load_conversations_opens_most_recent() {
        let actor = actor(Role::Citizen);
        let store = MockStore::default();
        let older = store.seed_conversation(actor.id, Role::Citizen, "Older");
        let newer = store.seed_conversation(actor.id, Role::Lawyer, "Newer");
        store.seed_turn(newer.id, AuthorKind::User, "q");
        store.seed_turn(older.id, AuthorKind::User, "other");
        // Someone else's conversation is never listed.
        store.seed_conversation(Uuid::now_v7(), Role::Citizen, "Foreign");

        let (manager, _, _) = build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.load_conversations().await.unwrap();

        let snap = manager.snapshot();
        assert_eq!(snap.state, SlotState::Loaded);
        assert_eq!(snap.conversations.len(), 2);
        assert_eq!(snap.conversations[0].id, newer.id);
        assert_eq!(snap.active_conversation.unwrap().id, newer.id);
        assert_eq!(snap.turns.len(), 1);
        assert_eq!(snap.turns[0].content(), "q");
    }

    #[tokio::test]
    async fn load_with_no_conversations_stays_idle() {
        let (manager, _, _) = build(
            actor(Role::Student),
            MockStore::default(),
            MockGenerator::default(),
            SessionSettings::default(),
        );
        manager.load_conversations().await.unwrap();

        let snap = manager.snapshot();
        assert_eq!(snap.state, SlotState::Idle);
        assert!(snap.conversations.is_empty());
        assert!(snap.last_error.is_none());
    }

    #[tokio::test]
    async fn select_discards_previous_turns_and_fetches_fresh() {
        let actor = actor(Role::Citizen);
        let store = MockStore::default();
        let a = store.seed_conversation(actor.id, Role::Citizen, "A");
        let b = store.seed_conversation(actor.id, Role::Citizen, "B");
        store.seed_turn(a.id, AuthorKind::User, "in A");
        store.seed_turn(b.id, AuthorKind::User, "in B");
        store.seed_turn(b.id, AuthorKind::Assistant, "reply in B");

        let (manager, _, _) = build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.load_conversations().await.unwrap();
        manager.select_conversation(a.id).await.unwrap();

        let snap = manager.snapshot();
        assert_eq!(snap.active_conversation.unwrap().id, a.id);
        let contents: Vec<_> = snap.turns.iter().map(|t| t.content().to_string()).collect();
        assert_eq!(contents, vec!["in A"]);
    }

    #[tokio::test]
    async fn select_failure_surfaces_store_read_error() {
        let actor = actor(Role::Citizen);
        let store = MockStore::default();
        let a = store.seed_conversation(actor.id, Role::Citizen, "A");
        let (manager, store, _) = build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.refresh_conversations().await.unwrap();

        store.fail_list_messages.store(true, Ordering::SeqCst);
        let err = manager.select_conversation(a.id).await.unwrap_err();

        assert!(matches!(err, SessionError::StoreRead(_)));
        let snap = manager.snapshot();
        assert_eq!(snap.state, SlotState::Idle);
        assert!(snap.active_conversation.is_none());
        assert_eq!(snap.last_error, Some(err));
    }

    #[tokio::test]
    async fn select_unknown_conversation_is_a_precondition_violation() {
        let (manager, _, _, _) = with_empty_conversation(Role::Citizen, MockGenerator::default()).await;
        let missing = Uuid::now_v7();
        let err = manager.select_conversation(missing).await.unwrap_err();
        assert_eq!(
            err,
            SessionError::Precondition(PreconditionViolation::UnknownConversation(missing))
        );
        assert!(manager.snapshot().last_error.is_none());
    }

    #[tokio::test]
    async fn create_prepends_and_activates_with_actor_role() {
        let actor = actor(Role::Student);
        let store = MockStore::default();
        store.seed_conversation(actor.id, Role::Lawyer, "Existing");
        let (manager, _, _) = build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.load_conversations().await.unwrap();

        let created = manager.create_conversation().await.unwrap();

        assert_eq!(created.role_context, Role::Student);
        assert_eq!(created.title, PLACEHOLDER_TITLE);
        let snap = manager.snapshot();
        assert_eq!(snap.conversations.len(), 2);
        assert_eq!(snap.conversations[0].id, created.id);
        assert_eq!(snap.active_conversation.unwrap().id, created.id);
        assert!(snap.turns.is_empty());
        assert_eq!(snap.state, SlotState::Loaded);
    }

    #[tokio::test]
    async fn create_failure_restores_slot_and_keeps_list() {
        let actor = actor(Role::Citizen);
        let store = MockStore::default();
        let existing = store.seed_conversation(actor.id, Role::Citizen, "Existing");
        let (manager, store, _) = build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.load_conversations().await.unwrap();
        let before = manager.snapshot();

        store.fail_create.store(true, Ordering::SeqCst);
        let err = manager.create_conversation().await.unwrap_err();

        assert!(matches!(err, SessionError::StoreWrite(_)));
        let snap = manager.snapshot();
        assert_eq!(snap.state, SlotState::Loaded);
        assert_eq!(snap.conversations, before.conversations);
        assert_eq!(snap.active_conversation.unwrap().id, existing.id);
        assert_eq!(snap.last_error, Some(err));
    }

    #[tokio::test]
    async fn create_failure_from_idle_stays_idle() {
        let (manager, store, _) = build(
            actor(Role::Student),
            MockStore::default(),
            MockGenerator::default(),
            SessionSettings::default(),
        );
        store.fail_create.store(true, Ordering::SeqCst);

        manager.create_conversation().await.unwrap_err();

        let snap = manager.snapshot();
        assert_eq!(snap.state, SlotState::Idle);
        assert!(snap.conversations.is_empty());
        assert!(snap.active_conversation.is_none());
    }

    #[tokio::test]
    async fn refresh_failure_keeps_previous_list() {
        let actor = actor(Role::Lawyer);
        let store = MockStore::default();
        store.seed_conversation(actor.id, Role::Lawyer, "Bail");
        store.seed_conversation(actor.id, Role::Lawyer, "Writ petition");
        let (manager, store, _) = build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.load_conversations().await.unwrap();
        let before = manager.snapshot();

        store.fail_list_conversations.store(true, Ordering::SeqCst);
        let err = manager.refresh_conversations().await.unwrap_err();

        assert!(matches!(err, SessionError::StoreRead(_)));
        let snap = manager.snapshot();
        assert_eq!(snap.conversations, before.conversations);
        assert_eq!(snap.active_conversation, before.active_conversation);
        assert_eq!(snap.turns, before.turns);
        assert_eq!(snap.state, SlotState::Loaded);
        assert_eq!(snap.last_error, Some(err));
    }

    #[tokio::test]
    async fn open_listed_conversation_selects_it() {
        let actor = actor(Role::Citizen);
        let store = MockStore::default();
        let a = store.seed_conversation(actor.id, Role::Citizen, "A");
        store.seed_conversation(actor.id, Role::Citizen, "B");
        store.seed_turn(a.id, AuthorKind::User, "in A");
        let (manager, _, _) = build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.load_conversations().await.unwrap();

        manager.open_conversation(a.id).await.unwrap();

        let snap = manager.snapshot();
        assert_eq!(snap.active_conversation.unwrap().id, a.id);
        assert_eq!(snap.turns.len(), 1);
    }

    #[tokio::test]
    async fn open_missing_conversation_is_unknown() {
        let (manager, _, _, _) = with_empty_conversation(Role::Citizen, MockGenerator::default()).await;
        let missing = Uuid::now_v7();

        let err = manager.open_conversation(missing).await.unwrap_err();

        assert_eq!(
            err,
            SessionError::Precondition(PreconditionViolation::UnknownConversation(missing))
        );
        assert!(manager.snapshot().last_error.is_none());
    }

    #[tokio::test]
    async fn open_foreign_conversation_is_refused() {
        let (manager, store, _, active) =
            with_empty_conversation(Role::Citizen, MockGenerator::default()).await;
        let foreign = store.seed_conversation(Uuid::now_v7(), Role::Lawyer, "Not yours");

        let err = manager.open_conversation(foreign.id).await.unwrap_err();

        assert_eq!(
            err,
            SessionError::Precondition(PreconditionViolation::ForeignConversation(foreign.id))
        );
        let snap = manager.snapshot();
        assert_eq!(snap.active_conversation.unwrap().id, active);
        assert!(snap.conversations.iter().all(|c| c.id != foreign.id));
    }

    #[tokio::test]
    async fn open_own_conversation_missing_from_stale_list_refreshes() {
        let actor = actor(Role::Student);
        let owner_id = actor.id;
        let (manager, store, _) = build(actor, MockStore::default(), MockGenerator::default(), SessionSettings::default());
        manager.load_conversations().await.unwrap();
        // Created elsewhere after the list was read.
        let later = store.seed_conversation(owner_id, Role::Student, "From another device");
        store.seed_turn(later.id, AuthorKind::User, "hello");

        manager.open_conversation(later.id).await.unwrap();

        let snap = manager.snapshot();
        assert_eq!(snap.conversations.len(), 1);
        assert_eq!(snap.active_conversation.unwrap().id, later.id);
        assert_eq!(snap.turns.len(), 1);
        assert_eq!(snap.state, SlotState::Loaded);
    }

    #[tokio::test]
    async fn open_lookup_failure_is_a_store_read_error() {
        let (manager, store, _, _) = with_empty_conversation(Role::Citizen, MockGenerator::default()).await;
        store.fail_get.store(true, Ordering::SeqCst);

        let err = manager.open_conversation(Uuid::now_v7()).await.unwrap_err();

        assert!(matches!(err, SessionError::StoreRead(_)));
        assert_eq!(manager.snapshot().last_error, Some(err));
    }

    // -----------------------------------------------------------------
    // Send protocol
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn citizen_first_question_end_to_end() {
        let (manager, store, generator, conversation_id) =
            with_empty_conversation(Role::Citizen, MockGenerator::default()).await;
        let question = "What are my rights if evicted without notice?";

        let outcome = manager.submit_turn(question).await.unwrap();

        let SubmitOutcome::Completed { user_turn, reply, title } = outcome else {
            panic!("expected a completed send");
        };
        assert_eq!(user_turn.content, question);
        assert_eq!(reply.author, AuthorKind::Assistant);
        // 45 characters is under the cap, so it is used as-is.
        assert_eq!(title.as_deref(), Some(question));
        assert_eq!(store.title_of(conversation_id), question);

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].directive, role::directive_for(Role::Citizen));
        assert_eq!(requests[0].turns.len(), 1);
        assert_eq!(requests[0].turns[0].author, AuthorKind::User);
        assert_eq!(requests[0].turns[0].content, question);

        let snap = manager.snapshot();
        assert_eq!(durable(&snap), vec![user_turn, reply]);
        assert_eq!(snap.active_conversation.unwrap().title, question);
        assert_eq!(snap.state, SlotState::Loaded);
        assert!(!snap.sending);
        assert!(snap.last_error.is_none());
    }

    #[tokio::test]
    async fn long_first_question_is_truncated_to_cap() {
        let (manager, store, _, conversation_id) =
            with_empty_conversation(Role::Citizen, MockGenerator::default()).await;

        manager
            .submit_turn("What are my rights if evicted without notice by my landlord in Dhaka?")
            .await
            .unwrap();

        let expected = "What are my rights if evicted without notice by m…";
        assert_eq!(expected.chars().count(), 50);
        assert_eq!(store.title_of(conversation_id), expected);
        assert_eq!(manager.snapshot().conversations[0].title, expected);
    }

    #[tokio::test]
    async fn successful_send_appends_exactly_two_ordered_turns() {
        let actor = actor(Role::Lawyer);
        let store = MockStore::default();
        let c = store.seed_conversation(actor.id, Role::Lawyer, "Bail");
        store.seed_turn(c.id, AuthorKind::User, "q1");
        store.seed_turn(c.id, AuthorKind::Assistant, "a1");
        let (manager, store, _) = build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.load_conversations().await.unwrap();
        let prior = durable(&manager.snapshot());

        manager.submit_turn("q2").await.unwrap();

        let after = durable(&manager.snapshot());
        assert_eq!(after.len(), prior.len() + 2);
        assert_eq!(&after[..prior.len()], &prior[..]);
        assert_eq!(after[2].author, AuthorKind::User);
        assert_eq!(after[3].author, AuthorKind::Assistant);
        assert!(after.windows(2).all(|w| w[0].created_at < w[1].created_at));
        assert_eq!(after, store.stored_turns(c.id));
    }

    #[tokio::test]
    async fn directive_follows_conversation_role_not_actor_role() {
        let actor = actor(Role::Student);
        let store = MockStore::default();
        store.seed_conversation(actor.id, Role::Lawyer, "Created while a lawyer");
        let (manager, _, generator) =
            build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.load_conversations().await.unwrap();

        manager.submit_turn("Draft a bail argument").await.unwrap();

        assert_eq!(
            generator.requests()[0].directive,
            role::directive_for(Role::Lawyer)
        );
    }

    #[tokio::test]
    async fn generation_history_includes_prior_turns_in_order() {
        let actor = actor(Role::Student);
        let store = MockStore::default();
        let c = store.seed_conversation(actor.id, Role::Student, "Torts");
        store.seed_turn(c.id, AuthorKind::User, "What is a tort?");
        store.seed_turn(c.id, AuthorKind::Assistant, "A civil wrong.");
        let (manager, _, generator) =
            build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.load_conversations().await.unwrap();

        manager.submit_turn("Give an example").await.unwrap();

        let turns = &generator.requests()[0].turns;
        let contents: Vec<_> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["What is a tort?", "A civil wrong.", "Give an example"]);
    }

    #[tokio::test]
    async fn user_turn_write_failure_rolls_back_optimistic_turn() {
        let (manager, store, generator, _) =
            with_empty_conversation(Role::Citizen, MockGenerator::default()).await;
        manager.submit_turn("first").await.unwrap();
        let before = manager.snapshot().turns;

        *store.fail_append.lock().unwrap() = Some(AuthorKind::User);
        let err = manager.submit_turn("second").await.unwrap_err();

        assert!(matches!(err, SessionError::StoreWrite(_)));
        let snap = manager.snapshot();
        assert_eq!(snap.turns, before);
        assert_eq!(snap.last_error, Some(err));
        assert_eq!(snap.state, SlotState::Loaded);
        // Generation never ran for the failed send.
        assert_eq!(generator.requests().len(), 1);
    }

    #[tokio::test]
    async fn generation_failure_keeps_user_turn_without_reply() {
        let generator = MockGenerator::replying(vec![Err(GenerationError::Unavailable(
            "authentication failed".to_string(),
        ))]);
        let (manager, store, _, conversation_id) =
            with_empty_conversation(Role::Citizen, generator).await;

        let err = manager.submit_turn("Is a verbal lease valid?").await.unwrap_err();

        assert!(matches!(err, SessionError::Generation(_)));
        let snap = manager.snapshot();
        let turns = durable(&snap);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].author, AuthorKind::User);
        assert_eq!(snap.turns.len(), 1);
        assert_eq!(store.stored_turns(conversation_id), turns);
        // No title without a completed exchange.
        assert_eq!(store.title_of(conversation_id), PLACEHOLDER_TITLE);
        assert_eq!(store.title_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generation_timeout_then_resubmit_is_accepted() {
        let generator = MockGenerator::replying(vec![Err(GenerationError::Timeout { after_ms: 60_000 })]);
        let (manager, _, _, _) = with_empty_conversation(Role::Citizen, generator).await;

        let err = manager.submit_turn("Can my employer withhold wages?").await.unwrap_err();
        assert_eq!(
            err,
            SessionError::Generation(GenerationError::Timeout { after_ms: 60_000 })
        );
        let snap = manager.snapshot();
        assert_eq!(durable(&snap).len(), 1);
        assert_eq!(snap.state, SlotState::Loaded);
        assert_eq!(snap.last_error, Some(err));

        let outcome = manager.submit_turn("Can my employer withhold wages?").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
        let turns = durable(&manager.snapshot());
        let authors: Vec<_> = turns.iter().map(|t| t.author).collect();
        assert_eq!(
            authors,
            vec![AuthorKind::User, AuthorKind::User, AuthorKind::Assistant]
        );
    }

    #[tokio::test]
    async fn reply_write_failure_keeps_user_turn_and_surfaces_error() {
        let (manager, store, _, conversation_id) =
            with_empty_conversation(Role::Citizen, MockGenerator::default()).await;
        *store.fail_append.lock().unwrap() = Some(AuthorKind::Assistant);

        let err = manager.submit_turn("Where do I file a GD?").await.unwrap_err();

        assert!(matches!(err, SessionError::StoreWrite(_)));
        let snap = manager.snapshot();
        assert_eq!(durable(&snap).len(), 1);
        assert_eq!(snap.state, SlotState::Loaded);
        assert_eq!(store.stored_turns(conversation_id).len(), 1);
        assert_eq!(store.title_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn title_is_derived_exactly_once() {
        let (manager, store, _, conversation_id) =
            with_empty_conversation(Role::Student, MockGenerator::default()).await;

        let first = manager.submit_turn("Explain res judicata").await.unwrap();
        let second = manager.submit_turn("And res sub judice?").await.unwrap();

        assert!(matches!(first, SubmitOutcome::Completed { title: Some(_), .. }));
        assert!(matches!(second, SubmitOutcome::Completed { title: None, .. }));
        assert_eq!(store.title_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.title_of(conversation_id), "Explain res judicata");
    }

    #[tokio::test]
    async fn title_waits_for_first_completed_exchange() {
        let generator = MockGenerator::replying(vec![Err(GenerationError::EmptyOutput)]);
        let (manager, store, _, conversation_id) =
            with_empty_conversation(Role::Student, generator).await;

        manager.submit_turn("first try").await.unwrap_err();
        manager.submit_turn("second try").await.unwrap();

        assert_eq!(store.title_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.title_of(conversation_id), "second try");
    }

    #[tokio::test]
    async fn loaded_conversation_with_reply_is_never_retitled() {
        let actor = actor(Role::Citizen);
        let store = MockStore::default();
        let c = store.seed_conversation(actor.id, Role::Citizen, "Already titled");
        store.seed_turn(c.id, AuthorKind::User, "q");
        store.seed_turn(c.id, AuthorKind::Assistant, "a");
        let (manager, store, _) = build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.load_conversations().await.unwrap();

        manager.submit_turn("follow up").await.unwrap();

        assert_eq!(store.title_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.title_of(c.id), "Already titled");
    }

    #[tokio::test]
    async fn title_save_failure_is_surfaced_and_not_retried() {
        let (manager, store, _, conversation_id) =
            with_empty_conversation(Role::Citizen, MockGenerator::default()).await;
        store.fail_title.store(true, Ordering::SeqCst);

        let outcome = manager.submit_turn("Inheritance shares for daughters").await.unwrap();

        assert!(matches!(outcome, SubmitOutcome::Completed { title: None, .. }));
        let snap = manager.snapshot();
        assert_eq!(durable(&snap).len(), 2);
        assert!(matches!(snap.last_error, Some(SessionError::StoreWrite(_))));
        assert_eq!(snap.active_conversation.unwrap().title, PLACEHOLDER_TITLE);

        store.fail_title.store(false, Ordering::SeqCst);
        manager.submit_turn("And for sons?").await.unwrap();
        assert_eq!(store.title_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.title_of(conversation_id), PLACEHOLDER_TITLE);
    }

    #[tokio::test]
    async fn send_moves_conversation_to_front_of_list() {
        let actor = actor(Role::Citizen);
        let store = MockStore::default();
        let older = store.seed_conversation(actor.id, Role::Citizen, "Older");
        let _newer = store.seed_conversation(actor.id, Role::Citizen, "Newer");
        let (manager, _, _) = build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.load_conversations().await.unwrap();
        manager.select_conversation(older.id).await.unwrap();
        assert_eq!(manager.snapshot().conversations[1].id, older.id);

        manager.submit_turn("bump").await.unwrap();

        assert_eq!(manager.snapshot().conversations[0].id, older.id);
    }

    #[tokio::test]
    async fn preconditions_never_reach_a_gateway() {
        let (manager, store, generator) = build(
            actor(Role::Citizen),
            MockStore::default(),
            MockGenerator::default(),
            SessionSettings::default(),
        );

        let err = manager.submit_turn("hello").await.unwrap_err();
        assert_eq!(
            err,
            SessionError::Precondition(PreconditionViolation::NoActiveConversation)
        );

        manager.create_conversation().await.unwrap();
        let err = manager.submit_turn("   ").await.unwrap_err();
        assert_eq!(err, SessionError::Precondition(PreconditionViolation::EmptyInput));

        assert!(manager.snapshot().last_error.is_none());
        assert!(manager.snapshot().turns.is_empty());
        assert!(generator.requests().is_empty());
        assert!(store.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_error_dismisses_notification() {
        let generator = MockGenerator::replying(vec![Err(GenerationError::EmptyOutput)]);
        let (manager, _, _, _) = with_empty_conversation(Role::Citizen, generator).await;
        manager.submit_turn("q").await.unwrap_err();
        assert!(manager.snapshot().last_error.is_some());

        manager.clear_error();

        assert!(manager.snapshot().last_error.is_none());
    }

    // -----------------------------------------------------------------
    // Concurrency: the single-flight gate
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn submit_while_sending_is_ignored() {
        let gate = Arc::new(Gate::default());
        let (manager, store, generator, conversation_id) =
            with_empty_conversation(Role::Citizen, MockGenerator::gated(gate.clone())).await;

        let in_flight = tokio::spawn({
            let manager = manager.clone();
            async move { manager.submit_turn("first").await }
        });
        gate.entered.notified().await;

        let during = manager.snapshot();
        assert!(during.sending);
        assert_eq!(during.state, SlotState::Sending);

        let outcome = manager.submit_turn("duplicate").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Ignored);
        assert_eq!(manager.snapshot(), during);

        gate.release.notify_one();
        in_flight.await.unwrap().unwrap();

        assert_eq!(generator.requests().len(), 1);
        let stored = store.stored_turns(conversation_id);
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|t| t.content != "duplicate"));
    }

    #[tokio::test]
    async fn optimistic_turn_is_visible_before_store_confirms() {
        let (manager, store, _, _) =
            with_empty_conversation(Role::Citizen, MockGenerator::default()).await;
        store.hang_append.store(true, Ordering::SeqCst);

        let in_flight = tokio::spawn({
            let manager = manager.clone();
            async move { manager.submit_turn("visible now").await }
        });
        // Let the send reach the store call.
        while !manager.snapshot().sending {
            tokio::task::yield_now().await;
        }

        let snap = manager.snapshot();
        assert_eq!(snap.turns.len(), 1);
        assert!(snap.turns[0].is_pending());
        assert_eq!(snap.turns[0].content(), "visible now");

        in_flight.abort();
        let _ = in_flight.await;
    }

    #[tokio::test]
    async fn select_and_create_while_sending_are_refused() {
        let actor = actor(Role::Citizen);
        let store = MockStore::default();
        let b = store.seed_conversation(actor.id, Role::Citizen, "B");
        let a = store.seed_conversation(actor.id, Role::Citizen, "A");
        let gate = Arc::new(Gate::default());
        let (manager, store, _) = build(
            actor,
            store,
            MockGenerator::gated(gate.clone()),
            SessionSettings::default(),
        );
        manager.load_conversations().await.unwrap();
        assert_eq!(manager.snapshot().active_conversation.unwrap().id, a.id);

        let in_flight = tokio::spawn({
            let manager = manager.clone();
            async move { manager.submit_turn("question in A").await }
        });
        gate.entered.notified().await;
        let during = manager.snapshot();

        let busy = SessionError::Precondition(PreconditionViolation::Busy);
        assert_eq!(manager.select_conversation(b.id).await.unwrap_err(), busy);
        assert_eq!(manager.create_conversation().await.unwrap_err(), busy);
        assert_eq!(manager.refresh_conversations().await.unwrap_err(), busy);
        assert_eq!(manager.snapshot(), during);

        gate.release.notify_one();
        in_flight.await.unwrap().unwrap();

        let snap = manager.snapshot();
        assert_eq!(snap.active_conversation.as_ref().unwrap().id, a.id);
        assert_eq!(durable(&snap).len(), 2);
        assert!(store.stored_turns(b.id).is_empty());

        // Once the send resolves, switching works.
        manager.select_conversation(b.id).await.unwrap();
        assert!(manager.snapshot().turns.is_empty());
    }

    #[tokio::test]
    async fn submit_while_loading_is_busy() {
        let actor = actor(Role::Citizen);
        let gate = Arc::new(Gate::default());
        let store = MockStore {
            list_messages_gate: Some(gate.clone()),
            ..MockStore::default()
        };
        let a = store.seed_conversation(actor.id, Role::Citizen, "A");
        let (manager, _, generator) = build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.refresh_conversations().await.unwrap();

        let loading = tokio::spawn({
            let manager = manager.clone();
            async move { manager.select_conversation(a.id).await }
        });
        gate.entered.notified().await;
        assert_eq!(manager.snapshot().state, SlotState::Loading);

        let err = manager.submit_turn("too early").await.unwrap_err();
        assert_eq!(err, SessionError::Precondition(PreconditionViolation::Busy));

        gate.release.notify_one();
        loading.await.unwrap().unwrap();
        assert_eq!(manager.snapshot().state, SlotState::Loaded);
        assert!(generator.requests().is_empty());
    }

    // -----------------------------------------------------------------
    // Timeouts, retry, cancellation
    // -----------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn hanging_store_write_times_out_and_rolls_back() {
        let (manager, store, _, _) =
            with_empty_conversation(Role::Citizen, MockGenerator::default()).await;
        store.hang_append.store(true, Ordering::SeqCst);

        let err = manager.submit_turn("anyone there?").await.unwrap_err();

        assert_eq!(err, SessionError::StoreWrite("timed out after 15s".to_string()));
        let snap = manager.snapshot();
        assert!(snap.turns.is_empty());
        assert!(!snap.sending);
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_store_timeout_reports_milliseconds() {
        let settings = SessionSettings {
            store_timeout: Duration::from_millis(250),
            ..SessionSettings::default()
        };
        let (manager, store, _) = build(
            actor(Role::Citizen),
            MockStore::default(),
            MockGenerator::default(),
            settings,
        );
        manager.create_conversation().await.unwrap();
        store.hang_append.store(true, Ordering::SeqCst);

        let err = manager.submit_turn("quick?").await.unwrap_err();

        assert_eq!(err, SessionError::StoreWrite("timed out after 250ms".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_generation_failure_is_retried() {
        let generator = MockGenerator::replying(vec![
            Err(GenerationError::Rejected("overloaded".to_string())),
            Ok("Second time lucky.".to_string()),
        ]);
        let settings = SessionSettings {
            retry: RetryPolicy {
                max_attempts: 3,
                ..RetryPolicy::default()
            },
            ..SessionSettings::default()
        };
        let (manager, store, generator) = build(actor(Role::Citizen), MockStore::default(), generator, settings);
        let conversation = manager.create_conversation().await.unwrap();

        let outcome = manager.submit_turn("Retry me").await.unwrap();

        let SubmitOutcome::Completed { reply, .. } = outcome else {
            panic!("expected a completed send");
        };
        assert_eq!(reply.content, "Second time lucky.");
        assert_eq!(generator.requests().len(), 2);
        // Retries never duplicate the user turn.
        assert_eq!(store.stored_turns(conversation.id).len(), 2);
    }

    #[tokio::test]
    async fn dropped_send_returns_slot_to_loaded() {
        let gate = Arc::new(Gate::default());
        let (manager, _, _, _) =
            with_empty_conversation(Role::Citizen, MockGenerator::gated(gate.clone())).await;

        let in_flight = tokio::spawn({
            let manager = manager.clone();
            async move { manager.submit_turn("abandoned").await }
        });
        gate.entered.notified().await;
        in_flight.abort();
        assert!(in_flight.await.unwrap_err().is_cancelled());

        let snap = manager.snapshot();
        assert_eq!(snap.state, SlotState::Loaded);
        // The user turn was already durable and stays.
        assert_eq!(durable(&snap).len(), 1);
        assert!(snap.turns.iter().all(|t| !t.is_pending()));

        gate.release.notify_one();
        let outcome = manager.submit_turn("next").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_send_before_store_confirms_removes_optimistic_turn() {
        let (manager, store, _, _) =
            with_empty_conversation(Role::Citizen, MockGenerator::default()).await;
        store.hang_append.store(true, Ordering::SeqCst);

        let result = tokio::time::timeout(
            Duration::from_millis(10),
            manager.submit_turn("never confirmed"),
        )
        .await;

        assert!(result.is_err());
        let snap = manager.snapshot();
        assert!(snap.turns.is_empty());
        assert_eq!(snap.state, SlotState::Loaded);
    }

    #[tokio::test]
    async fn dropped_select_ends_without_active_conversation() {
        let actor = actor(Role::Citizen);
        let gate = Arc::new(Gate::default());
        let store = MockStore {
            list_messages_gate: Some(gate.clone()),
            ..MockStore::default()
        };
        let a = store.seed_conversation(actor.id, Role::Citizen, "A");
        store.seed_turn(a.id, AuthorKind::User, "in A");
        let (manager, _, _) = build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.refresh_conversations().await.unwrap();

        let loading = tokio::spawn({
            let manager = manager.clone();
            async move { manager.select_conversation(a.id).await }
        });
        gate.entered.notified().await;
        assert_eq!(manager.snapshot().state, SlotState::Loading);
        loading.abort();
        assert!(loading.await.unwrap_err().is_cancelled());

        let snap = manager.snapshot();
        assert_eq!(snap.state, SlotState::Idle);
        assert!(snap.active_conversation.is_none());
        assert!(snap.turns.is_empty());
        assert_eq!(snap.conversations.len(), 1);
        assert!(snap.last_error.is_none());
    }

    #[tokio::test]
    async fn dropped_create_restores_previous_slot() {
        let actor = actor(Role::Lawyer);
        let gate = Arc::new(Gate::default());
        let store = MockStore {
            create_gate: Some(gate.clone()),
            ..MockStore::default()
        };
        let existing = store.seed_conversation(actor.id, Role::Lawyer, "Existing");
        let (manager, _, _) = build(actor, store, MockGenerator::default(), SessionSettings::default());
        manager.load_conversations().await.unwrap();
        let before = manager.snapshot();

        let creating = tokio::spawn({
            let manager = manager.clone();
            async move { manager.create_conversation().await }
        });
        gate.entered.notified().await;
        assert_eq!(manager.snapshot().state, SlotState::Loading);
        creating.abort();
        assert!(creating.await.unwrap_err().is_cancelled());

        let snap = manager.snapshot();
        assert_eq!(snap, before);
        assert_eq!(snap.active_conversation.unwrap().id, existing.id);
    }

    #[tokio::test]
    async fn dropped_refresh_restores_previous_slot() {
        let actor = actor(Role::Student);
        let gate = Arc::new(Gate::default());
        let store = MockStore {
            list_conversations_gate: Some(gate.clone()),
            ..MockStore::default()
        };
        store.seed_conversation(actor.id, Role::Student, "Torts");
        let (manager, _, _) = build(actor, store, MockGenerator::default(), SessionSettings::default());

        let loading = tokio::spawn({
            let manager = manager.clone();
            async move { manager.load_conversations().await }
        });
        gate.entered.notified().await;
        gate.release.notify_one();
        loading.await.unwrap().unwrap();
        let before = manager.snapshot();
        assert_eq!(before.state, SlotState::Loaded);

        let refreshing = tokio::spawn({
            let manager = manager.clone();
            async move { manager.refresh_conversations().await }
        });
        gate.entered.notified().await;
        assert_eq!(manager.snapshot().state, SlotState::Loading);
        refreshing.abort();
        assert!(refreshing.await.unwrap_err().is_cancelled());

        assert_eq!(manager.snapshot(), before);
    }

    // -----------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn send_publishes_step_events_in_order() {
        let (manager, _, _, conversation_id) =
            with_empty_conversation(Role::Citizen, MockGenerator::default()).await;
        let mut rx = manager.subscribe();

        manager.submit_turn("Tell me about khas land").await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events.first(),
            Some(&SessionEvent::SendingChanged { sending: true })
        );
        assert_eq!(
            events.last(),
            Some(&SessionEvent::SendingChanged { sending: false })
        );
        assert!(events.contains(&SessionEvent::TurnsChanged {
            conversation_id,
            len: 2
        }));
        assert!(events.contains(&SessionEvent::TitleDerived {
            conversation_id,
            title: "Tell me about khas land".to_string(),
        }));
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::ErrorRaised { .. })));
    }

    #[tokio::test]
    async fn snapshot_turns_are_durable_after_completion() {
        let (manager, _, _, _) =
            with_empty_conversation(Role::Lawyer, MockGenerator::default()).await;
        manager.submit_turn("Limitation period for a civil suit").await.unwrap();

        let snap = manager.snapshot();
        assert!(snap.turns.iter().all(|t| matches!(t, SessionTurn::Durable(_))));
    }
}
