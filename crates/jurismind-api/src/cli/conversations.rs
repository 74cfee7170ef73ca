//! Conversation listing: `jmind conversations`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use jurismind_core::chat::repository::ConversationStore;
use jurismind_core::role::metadata_for;
use jurismind_types::chat::Conversation;

use crate::state::AppState;

/// Longest title shown in a table cell before it is elided.
const TITLE_DISPLAY_CHARS: usize = 40;

/// List the actor's conversations with title, role and last activity.
///
/// # Examples
///
/// ```bash
/// jmind conversations
/// jmind conversations --json
/// ```
pub async fn list_conversations(state: &AppState, json: bool) -> Result<()> {
    let actor = state.load_actor().await?;
    let conversations = state.store.list_conversations(&actor.id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversations)?);
        return Ok(());
    }

    if conversations.is_empty() {
        println!();
        println!(
            "  {} No conversations yet. Start one with: {}",
            style("i").blue().bold(),
            style("jmind chat").yellow()
        );
        println!();
        return Ok(());
    }

    println!();
    println!("{}", conversation_table(&conversations, Utc::now()));
    println!();
    println!(
        "  {} conversation{}",
        style(conversations.len()).bold(),
        if conversations.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Build the listing table. Rows are numbered from 1 in list order, which
/// is the order `/switch <n>` uses.
pub fn conversation_table(conversations: &[Conversation], now: DateTime<Utc>) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Last activity").fg(Color::White),
        Cell::new("ID").fg(Color::White),
    ]);

    for (index, conversation) in conversations.iter().enumerate() {
        let id = conversation.id.to_string();
        table.add_row(vec![
            Cell::new(index + 1).fg(Color::DarkGrey),
            Cell::new(elide(&conversation.title, TITLE_DISPLAY_CHARS)).fg(Color::Cyan),
            Cell::new(metadata_for(conversation.role_context).title).fg(Color::White),
            Cell::new(relative_time(conversation.updated_at, now)).fg(Color::DarkGrey),
            Cell::new(&id[..8]).fg(Color::DarkGrey),
        ]);
    }

    table
}

/// Shorten `text` to at most `max` characters, ending in `...` when cut.
pub fn elide(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Human-friendly age of a timestamp ("just now", "5m ago", "3d ago").
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    if elapsed.num_seconds() < 60 {
        "just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_days() < 30 {
        format!("{}d ago", elapsed.num_days())
    } else {
        at.format("%Y-%m-%d").to_string()
    }
}
