//! Text-generation abstractions for JurisMind.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `GenerationGateway`: what the session manager calls to get a reply
//! - `RetryPolicy`: bounded backoff around the generation call

pub mod box_provider;
pub mod gateway;
pub mod provider;
pub mod retry;
