//! Main chat loop orchestration.
//!
//! Resolves the actor, wires a session manager, opens the requested (or
//! most recent) conversation, then reads input until Ctrl+D or `/exit`.
//! Every send goes through `SessionManager::submit_turn`, so the
//! optimistic turn, rollback and title derivation all happen in core.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use jurismind_core::chat::session::SubmitOutcome;
use jurismind_core::role::metadata_for;
use jurismind_types::chat::{AuthorKind, SessionTurn};
use jurismind_types::error::{PreconditionViolation, SessionError};

use crate::cli::conversations::conversation_table;
use crate::cli::roles::{accent_color, print_role_card};
use crate::state::{AppState, ConcreteSessionManager};

use super::banner::{print_footer, print_session_header, print_welcome_banner};
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};

/// What the loop does after a slash command.
enum Flow {
    Continue,
    Exit,
}

/// Run the interactive chat loop.
pub async fn run_chat_loop(state: &AppState, conversation: Option<Uuid>, new: bool) -> Result<()> {
    let actor = state.load_actor().await?;
    let session = state.build_session(actor)?;

    let mut events = session.subscribe();
    let listener = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::debug!(?event, "session event"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "session event listener lagged")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let Err(e) = session.load_conversations().await {
        print_error(&session, &e);
    }

    if new {
        session.create_conversation().await?;
    } else if let Some(conversation_id) = conversation {
        session
            .open_conversation(conversation_id)
            .await
            .with_context(|| format!("Could not open conversation {conversation_id}"))?;
    }

    show_active(&session);

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) = ChatInput::new(prompt)
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        match chat_input.read_line().await {
            InputEvent::Eof => break,
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
            }
            InputEvent::Message(text) => {
                if text.is_empty() {
                    continue;
                }
                if let Some(cmd) = commands::parse(&text) {
                    match handle_command(&session, &mut chat_input, cmd).await {
                        Flow::Continue => continue,
                        Flow::Exit => break,
                    }
                }
                send(&session, &text).await;
            }
        }
    }

    chat_input.flush();
    println!("\n  {}", style("Session ended.").dim());
    listener.abort();
    Ok(())
}

async fn handle_command(
    session: &ConcreteSessionManager,
    chat_input: &mut ChatInput,
    cmd: ChatCommand,
) -> Flow {
    match cmd {
        ChatCommand::Help => commands::print_help(),
        ChatCommand::New => match session.create_conversation().await {
            Ok(_) => show_active(session),
            Err(e) => print_error(session, &e),
        },
        ChatCommand::List => {
            if let Err(e) = session.refresh_conversations().await {
                print_error(session, &e);
            }
            let snapshot = session.snapshot();
            if snapshot.conversations.is_empty() {
                println!(
                    "\n  {} No conversations yet. Just type to start one.\n",
                    style("i").blue().bold()
                );
            } else {
                println!();
                println!("{}", conversation_table(&snapshot.conversations, chrono::Utc::now()));
                if let Some(active) = &snapshot.active_conversation {
                    println!("  {} {}", style("Active:").bold(), active.title);
                }
                println!();
            }
        }
        ChatCommand::Switch(target) => {
            let conversations = session.snapshot().conversations;
            match target.resolve(&conversations) {
                Some(conversation_id) => match session.select_conversation(conversation_id).await
                {
                    Ok(()) => show_active(session),
                    Err(e) => print_error(session, &e),
                },
                None => println!(
                    "\n  {} No conversation matches. Use /list to see them.\n",
                    style("?").yellow().bold()
                ),
            }
        }
        ChatCommand::History => show_active(session),
        ChatCommand::Role => print_role_card(metadata_for(session.actor().role)),
        ChatCommand::Clear => chat_input.clear(),
        ChatCommand::Exit => return Flow::Exit,
        ChatCommand::Unknown(cmd_name) => println!(
            "\n  {} Unknown command: {}. Type /help for available commands.\n",
            style("?").yellow().bold(),
            style(cmd_name).dim()
        ),
    }
    Flow::Continue
}

/// Submit one user turn and print the reply.
async fn send(session: &ConcreteSessionManager, text: &str) {
    // Typing before any conversation exists starts one.
    if session.snapshot().active_conversation.is_none() {
        if let Err(e) = session.create_conversation().await {
            print_error(session, &e);
            return;
        }
    }

    let spinner = thinking_spinner();
    let started = Instant::now();
    let result = session.submit_turn(text).await;
    spinner.finish_and_clear();

    match result {
        Ok(SubmitOutcome::Completed { reply, title, .. }) => {
            print_turn(session, AuthorKind::Assistant, &reply.content);
            println!(
                "  {}",
                style(format!("{:.1}s", started.elapsed().as_secs_f64())).dim()
            );
            if let Some(title) = title {
                println!("  {} {}", style("Titled:").dim(), style(title).cyan());
            }
            // A failed title save still completes the send.
            if let Some(error) = session.snapshot().last_error {
                print_error(session, &error);
            }
            println!();
        }
        Ok(SubmitOutcome::Ignored) => {}
        Err(SessionError::Precondition(PreconditionViolation::EmptyInput)) => {}
        Err(e) => {
            print_error(session, &e);
            println!(
                "  {}",
                style("Type a message to retry, /exit to quit.").dim()
            );
        }
    }
}

/// Print the header and either the welcome card or the transcript.
fn show_active(session: &ConcreteSessionManager) {
    let snapshot = session.snapshot();
    let actor = session.actor();
    print_session_header(actor, snapshot.active_conversation.as_ref());

    if snapshot.turns.is_empty() {
        let role = snapshot
            .active_conversation
            .as_ref()
            .map_or(actor.role, |c| c.role_context);
        print_welcome_banner(role);
        return;
    }

    println!();
    for turn in &snapshot.turns {
        if let SessionTurn::Durable(turn) = turn {
            print_turn(session, turn.author, &turn.content);
        }
    }
    println!();
    print_footer();
}

fn print_turn(session: &ConcreteSessionManager, author: AuthorKind, content: &str) {
    let label = match author {
        AuthorKind::User => style("You".to_string()).green().bold(),
        AuthorKind::Assistant => {
            // Replies speak with the role the conversation was created under.
            let role = session
                .snapshot()
                .active_conversation
                .map_or(session.actor().role, |c| c.role_context);
            let meta = metadata_for(role);
            style(meta.title.to_string())
                .fg(accent_color(meta.accent))
                .bold()
        }
    };
    println!();
    println!("  {label}");
    for line in content.lines() {
        println!("  {line}");
    }
}

/// Report a session error and dismiss it from the session state.
fn print_error(session: &ConcreteSessionManager, error: &SessionError) {
    eprintln!("\n  {} {error}", style("!").red().bold());
    session.clear_error();
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
