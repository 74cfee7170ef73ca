//! Generation gateway: the one request/response protocol surface of a send.
//!
//! A request carries only the materialized turn history and the behavior
//! directive. No conversation identity crosses this boundary.

use std::time::{Duration, Instant};

use jurismind_types::chat::AuthorKind;
use jurismind_types::config::GenerationConfig;
use jurismind_types::error::GenerationError;
use jurismind_types::llm::{CompletionRequest, LlmError, Message, MessageRole};
use serde::{Deserialize, Serialize};

use super::box_provider::BoxLlmProvider;

/// One `{authorKind, content}` pair of the history sent for generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationTurn {
    pub author: AuthorKind,
    pub content: String,
}

/// Ordered turn history plus the directive of the conversation's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub turns: Vec<GenerationTurn>,
    pub directive: String,
}

/// Text produced by the backend, already checked to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText(pub String);

impl GeneratedText {
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Trait for text-generation backends as seen by the session manager.
///
/// Implementations must bound their own network time and report expiry as
/// [`GenerationError::Timeout`].
pub trait GenerationGateway: Send + Sync {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<GeneratedText, GenerationError>> + Send;
}

/// [`GenerationGateway`] backed by an [`LlmProvider`](super::provider::LlmProvider).
pub struct ProviderGenerationGateway {
    provider: BoxLlmProvider,
    model: String,
    max_tokens: u32,
    temperature: Option<f64>,
    timeout: Duration,
}

impl ProviderGenerationGateway {
    /// `max_tokens` is clamped to what the provider can emit.
    pub fn new(provider: BoxLlmProvider, config: &GenerationConfig) -> Self {
        let limit = provider.capabilities().max_output_tokens;
        if config.max_tokens > limit {
            tracing::warn!(
                configured = config.max_tokens,
                limit,
                provider = %provider.name(),
                "max_tokens exceeds provider output limit, clamping"
            );
        }
        Self {
            max_tokens: config.max_tokens.min(limit),
            model: config.model.clone(),
            provider,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Build the provider request: directive as the system prompt, turns as
    /// user/assistant messages in their original order.
    pub fn build_completion_request(&self, request: &GenerationRequest) -> CompletionRequest {
        let messages = request
            .turns
            .iter()
            .map(|turn| Message {
                role: MessageRole::from(turn.author),
                content: turn.content.clone(),
            })
            .collect();

        CompletionRequest {
            model: self.model.clone(),
            messages,
            system: Some(request.directive.clone()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Classify a provider failure for the session manager.
pub fn map_llm_error(error: LlmError) -> GenerationError {
    if error.is_transient() {
        GenerationError::Rejected(error.to_string())
    } else {
        GenerationError::Unavailable(error.to_string())
    }
}

impl GenerationGateway for ProviderGenerationGateway {
    #[tracing::instrument(
        skip(self, request),
        fields(provider = %self.provider.name(), turns = request.turns.len())
    )]
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedText, GenerationError> {
        let completion = self.build_completion_request(request);
        let started = Instant::now();

        let response = match tokio::time::timeout(self.timeout, self.provider.complete(&completion)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "generation provider failed");
                return Err(map_llm_error(e));
            }
            Err(_) => {
                let after_ms = self.timeout.as_millis() as u64;
                tracing::warn!(after_ms, "generation timed out");
                return Err(GenerationError::Timeout { after_ms });
            }
        };

        if response.content.trim().is_empty() {
            tracing::warn!(stop_reason = %response.stop_reason, "generation returned empty output");
            return Err(GenerationError::EmptyOutput);
        }

        tracing::debug!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generation complete"
        );

        Ok(GeneratedText(response.content))
    }
}

impl std::fmt::Debug for ProviderGenerationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderGenerationGateway")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
