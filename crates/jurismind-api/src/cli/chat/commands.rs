//! Slash command parsing for the chat loop.
//!
//! Commands start with `/` and provide in-chat controls for switching
//! conversations, reviewing history, and leaving the session.

use console::style;
use uuid::Uuid;

use jurismind_types::chat::Conversation;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Start a new conversation under the current role.
    New,
    /// List conversations.
    List,
    /// Open another conversation by list number or ID.
    Switch(SwitchTarget),
    /// Reprint the active conversation.
    History,
    /// Show the current role card.
    Role,
    /// Clear the terminal screen.
    Clear,
    /// Exit the chat session.
    Exit,
    /// Unknown or malformed command.
    Unknown(String),
}

/// Argument of `/switch`.
#[derive(Debug, PartialEq)]
pub enum SwitchTarget {
    /// 1-based position in the conversation list.
    Index(usize),
    /// Full conversation id, or a prefix of one.
    Id(String),
}

impl SwitchTarget {
    fn parse(arg: &str) -> Option<Self> {
        if arg.is_empty() {
            return None;
        }
        match arg.parse::<usize>() {
            Ok(0) => None,
            Ok(n) => Some(Self::Index(n)),
            Err(_) => Some(Self::Id(arg.to_lowercase())),
        }
    }

    /// Find the conversation this target names.
    ///
    /// An id prefix must match exactly one conversation.
    pub fn resolve(&self, conversations: &[Conversation]) -> Option<Uuid> {
        match self {
            Self::Index(n) => n
                .checked_sub(1)
                .and_then(|i| conversations.get(i))
                .map(|c| c.id),
            Self::Id(text) => {
                let mut matches = conversations
                    .iter()
                    .filter(|c| c.id.to_string().starts_with(text.as_str()));
                match (matches.next(), matches.next()) {
                    (Some(only), None) => Some(only.id),
                    _ => None,
                }
            }
        }
    }
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, arg) = match trimmed.split_once(' ') {
        Some((cmd, arg)) => (cmd.to_lowercase(), arg.trim()),
        None => (trimmed.to_lowercase(), ""),
    };

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/new" => ChatCommand::New,
        "/list" | "/ls" => ChatCommand::List,
        "/switch" | "/open" => match SwitchTarget::parse(arg) {
            Some(target) => ChatCommand::Switch(target),
            None => ChatCommand::Unknown("/switch requires a list number or id".to_string()),
        },
        "/history" => ChatCommand::History,
        "/role" => ChatCommand::Role,
        "/clear" | "/cls" => ChatCommand::Clear,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Print the help text listing all available commands.
pub fn print_help() {
    let rows = [
        ("/help", "Show this help message"),
        ("/new", "Start a new conversation"),
        ("/list", "List your conversations"),
        ("/switch <n|id>", "Open a conversation from the list"),
        ("/history", "Show this conversation again"),
        ("/role", "Show your current role"),
        ("/clear", "Clear the screen"),
        ("/exit", "End the chat session"),
    ];

    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    for (command, description) in rows {
        println!("  {} {}", style(format!("{command:<16}")).cyan(), description);
    }
    println!();
    println!("  {}", style("Ctrl+D to exit").dim());
    println!();
}
