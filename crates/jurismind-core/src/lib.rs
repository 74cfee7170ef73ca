//! Business logic and gateway trait definitions for JurisMind.
//!
//! This crate defines the "ports" (store and generation traits) that the
//! infrastructure layer implements, the role directive resolver, and the
//! conversation session manager. It depends only on `jurismind-types` --
//! never on `jurismind-infra` or any database/IO crate.

pub mod chat;
pub mod llm;
pub mod role;
