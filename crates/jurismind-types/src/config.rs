//! Global configuration types for JurisMind.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! generation backend, timeouts, retry policy, and title derivation.

use serde::{Deserialize, Serialize};

use crate::llm::ProviderKind;

/// Top-level configuration.
///
/// Loaded from `~/.jurismind/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Maximum length of a derived conversation title, marker included.
    #[serde(default = "default_title_cap")]
    pub title_cap: usize,

    /// Upper bound on every record store call, in seconds.
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,

    #[serde(default)]
    pub generation: GenerationConfig,
}

fn default_title_cap() -> usize {
    50
}

fn default_store_timeout_secs() -> u64 {
    15
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            title_cap: default_title_cap(),
            store_timeout_secs: default_store_timeout_secs(),
            generation: GenerationConfig::default(),
        }
    }
}

/// Settings for the text-generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    #[serde(default = "default_model")]
    pub model: String,

    /// Required when `provider = "custom"`; overrides the preset otherwise.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_provider() -> ProviderKind {
    ProviderKind::Gemini
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "JURISMIND_API_KEY".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    2048
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_generation_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded retry with exponential backoff for the generation call.
///
/// `max_attempts = 1` disables retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}
