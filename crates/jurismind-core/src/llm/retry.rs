//! Bounded retry with exponential backoff for the generation call.
//!
//! Only the generation step is retried: nothing has been written when it
//! runs, so sending the same history again cannot duplicate a record.
//! Store writes are never routed through here.

use std::future::Future;
use std::time::Duration;

use jurismind_types::config::RetryConfig;
use jurismind_types::error::GenerationError;

/// Retry schedule for [`GenerationGateway::generate`](super::gateway::GenerationGateway::generate).
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self::from(&RetryConfig::default())
    }

    /// Whether attempt number `attempt` (1-based) that failed with `error`
    /// should be followed by another.
    pub fn should_retry(&self, attempt: u32, error: &GenerationError) -> bool {
        error.is_transient() && attempt < self.max_attempts.max(1)
    }

    /// Delay before attempt `attempt + 1`, after attempt `attempt` failed.
    ///
    /// `initial_backoff * multiplier^(attempt - 1)`, clamped to `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        let millis = self.initial_backoff.as_millis() as f64 * factor;
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. The last error is returned.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, GenerationError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if self.should_retry(attempt, &error) => {
                    let delay = self.backoff_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "generation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            backoff_multiplier: config.backoff_multiplier,
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
