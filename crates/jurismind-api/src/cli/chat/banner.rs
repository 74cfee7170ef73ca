//! Welcome banner display for chat sessions.

use console::style;

use jurismind_core::role::metadata_for;
use jurismind_types::actor::Actor;
use jurismind_types::chat::Conversation;
use jurismind_types::role::Role;

use crate::cli::roles::print_role_card;

/// Shown under every banner. The assistant gives guidance, not representation.
pub const DISCLAIMER: &str = "JurisMind provides general legal information for Bangladesh. \
It is not a substitute for advice from a licensed advocate.";

/// Print the session header: who is chatting, in which conversation.
pub fn print_session_header(actor: &Actor, conversation: Option<&Conversation>) {
    println!();
    println!(
        "  {} {}",
        style("JurisMind").cyan().bold(),
        style(format!("· {}", actor.label)).dim()
    );
    if let Some(conversation) = conversation {
        let id = conversation.id.to_string();
        println!(
            "  {}  {} {}",
            style("Conversation:").bold(),
            conversation.title,
            style(format!("({})", &id[..8])).dim()
        );
        if conversation.role_context != actor.role {
            println!(
                "  {}",
                style(format!(
                    "This conversation keeps the {} role it was started with.",
                    metadata_for(conversation.role_context).title
                ))
                .yellow()
            );
        }
    }
}

/// Print the welcome card for an empty conversation held under `role`.
pub fn print_welcome_banner(role: Role) {
    print_role_card(metadata_for(role));
    print_footer();
}

/// Print the disclaimer and the command hint.
pub fn print_footer() {
    println!("  {}", style(DISCLAIMER).dim().italic());
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
