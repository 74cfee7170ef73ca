//! Conversation session pipeline.
//!
//! - `repository`: the record store gateway trait
//! - `title`: title derivation from the first user input
//! - `state`: the in-memory state machine and its read model
//! - `events`: change notifications for a UI
//! - `session`: the manager that runs the send protocol

pub mod events;
pub mod repository;
pub mod session;
pub mod state;
pub mod title;
