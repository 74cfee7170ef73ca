//! Shared domain types for JurisMind.
//!
//! This crate contains the domain types used across the workspace:
//! Role, Actor, Conversation, Turn, LLM request shapes, configuration,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod actor;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod role;
