//! Interactive CLI chat experience for JurisMind.
//!
//! This module implements the chat loop on top of the session manager:
//! role welcome card, guidance disclaimer, a spinner while a reply is
//! generated, and slash commands. Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
