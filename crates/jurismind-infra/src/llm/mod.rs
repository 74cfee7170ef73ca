//! LLM provider implementations.
//!
//! Every supported backend speaks the OpenAI chat-completions dialect, so a
//! single [`OpenAiCompatibleProvider`] covers them all. [`create_provider`]
//! picks the preset matching the configured [`ProviderKind`].

pub mod openai_compat;

use secrecy::SecretString;

use jurismind_core::llm::box_provider::BoxLlmProvider;
use jurismind_types::config::GenerationConfig;
use jurismind_types::llm::{LlmError, ProviderKind};

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config;

/// Create a [`BoxLlmProvider`] from the generation section of `config.toml`.
///
/// A `base_url` in the configuration replaces the preset endpoint while
/// keeping the preset's name and limits.
///
/// # Errors
///
/// Returns [`LlmError::InvalidRequest`] if `provider = "custom"` is
/// configured without a `base_url`.
pub fn create_provider(
    generation: &GenerationConfig,
    api_key: SecretString,
) -> Result<BoxLlmProvider, LlmError> {
    let model = generation.model.as_str();

    let mut oai_config = match generation.provider {
        ProviderKind::OpenAi => config::openai_defaults(api_key, model),
        ProviderKind::Gemini => config::gemini_defaults(api_key, model),
        ProviderKind::Mistral => config::mistral_defaults(api_key, model),
        ProviderKind::Custom => {
            let base_url = generation.base_url.as_deref().ok_or_else(|| {
                LlmError::InvalidRequest(
                    "provider \"custom\" requires generation.base_url".to_string(),
                )
            })?;
            config::custom_defaults(api_key, base_url, model)
        }
    };

    if generation.provider != ProviderKind::Custom {
        if let Some(base_url) = generation.base_url.as_deref() {
            oai_config.base_url = base_url.trim_end_matches('/').to_string();
        }
    }

    tracing::debug!(
        provider = %oai_config.provider_name,
        model = %oai_config.model,
        base_url = %oai_config.base_url,
        "creating LLM provider"
    );

    Ok(BoxLlmProvider::new(OpenAiCompatibleProvider::new(oai_config)))
}
