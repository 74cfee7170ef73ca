//! Infrastructure layer for JurisMind.
//!
//! Contains implementations of the gateway traits defined in `jurismind-core`:
//! the SQLite record store, the OpenAI-compatible LLM provider, and the
//! filesystem adapters for configuration and the actor profile.

pub mod config;
pub mod filesystem;
pub mod llm;
pub mod sqlite;
