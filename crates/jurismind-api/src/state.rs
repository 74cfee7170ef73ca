//! Application state wiring the store, configuration, and generation backend.
//!
//! AppState holds the concrete instances used by the CLI. The session
//! manager is generic over the store and generation gateway traits;
//! [`ConcreteSessionManager`] pins it to the infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use jurismind_core::chat::session::{SessionManager, SessionSettings};
use jurismind_core::llm::gateway::ProviderGenerationGateway;
use jurismind_infra::config::{load_global_config, resolve_api_key};
use jurismind_infra::filesystem::profile::read_profile;
use jurismind_infra::filesystem::resolve_data_dir;
use jurismind_infra::llm::create_provider;
use jurismind_infra::sqlite::conversation::SqliteConversationStore;
use jurismind_infra::sqlite::pool::{DatabasePool, database_url};
use jurismind_types::actor::Actor;
use jurismind_types::config::GlobalConfig;

/// Session manager pinned to SQLite storage and the OpenAI-compatible backend.
pub type ConcreteSessionManager = SessionManager<SqliteConversationStore, ProviderGenerationGateway>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteConversationStore>,
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let config = load_global_config(&data_dir).await;

        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;
        let store = Arc::new(SqliteConversationStore::new(db_pool));

        Ok(Self {
            store,
            config,
            data_dir,
        })
    }

    /// Read the current actor from `profile.toml`.
    pub async fn load_actor(&self) -> anyhow::Result<Actor> {
        read_profile(&self.data_dir).await?.ok_or_else(|| {
            anyhow::anyhow!("No profile found. Create one with: jmind profile set")
        })
    }

    /// Wire a session manager for `actor` against the configured backend.
    pub fn build_session(&self, actor: Actor) -> anyhow::Result<ConcreteSessionManager> {
        let generation = &self.config.generation;
        let api_key = resolve_api_key(generation)?;
        let provider = create_provider(generation, api_key)?;
        tracing::info!(
            provider = provider.name(),
            model = %generation.model,
            "generation backend ready"
        );

        let gateway = ProviderGenerationGateway::new(provider, generation);
        Ok(SessionManager::new(
            actor,
            Arc::clone(&self.store),
            Arc::new(gateway),
            SessionSettings::from_config(&self.config),
        ))
    }
}
