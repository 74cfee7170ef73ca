//! Profile CLI commands: `jmind profile set`, `jmind profile show`.

use std::path::Path;

use anyhow::Result;
use console::style;
use dialoguer::{Input, Select};
use uuid::Uuid;

use jurismind_core::role::metadata_for;
use jurismind_infra::filesystem::profile::{read_profile, write_profile};
use jurismind_infra::filesystem::profile_path;
use jurismind_types::actor::Actor;
use jurismind_types::role::Role;

/// Create or update the profile, prompting for any missing value.
///
/// The actor id is kept across updates so existing conversations stay
/// visible after a role change.
pub async fn set_profile(
    data_dir: &Path,
    role: Option<Role>,
    label: Option<String>,
    json: bool,
) -> Result<()> {
    let existing = read_profile(data_dir).await?;

    let role = match role {
        Some(role) => role,
        None => prompt_role(existing.as_ref().map(|a| a.role))?,
    };

    let label = match label {
        Some(label) => label,
        None => match &existing {
            Some(actor) => actor.label.clone(),
            None => Input::<String>::new()
                .with_prompt("Your name or email")
                .interact_text()?,
        },
    };

    let id = existing.as_ref().map(|a| a.id).unwrap_or_else(Uuid::now_v7);
    let actor = Actor::new(id, label, role);
    write_profile(data_dir, &actor).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&actor)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Profile saved: {} as {}",
        style("✓").green().bold(),
        style(&actor.label).cyan(),
        style(metadata_for(actor.role).title).bold()
    );
    println!(
        "  {}",
        style("New conversations will use this role.").dim()
    );
    println!();
    Ok(())
}

/// Print the current profile.
pub async fn show_profile(data_dir: &Path, json: bool) -> Result<()> {
    let Some(actor) = read_profile(data_dir).await? else {
        if json {
            println!("null");
        } else {
            println!();
            println!(
                "  {} No profile yet. Create one with: {}",
                style("i").blue().bold(),
                style("jmind profile set").yellow()
            );
            println!();
        }
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&actor)?);
        return Ok(());
    }

    let meta = metadata_for(actor.role);
    println!();
    println!("  {}  {}", style("Label:").bold(), style(&actor.label).cyan());
    println!("  {}   {} ({})", style("Role:").bold(), meta.title, actor.role);
    println!("  {}     {}", style("Id:").bold(), style(actor.id).dim());
    println!(
        "  {}   {}",
        style("File:").bold(),
        style(profile_path(data_dir).display()).dim()
    );
    println!();
    Ok(())
}

fn prompt_role(current: Option<Role>) -> Result<Role> {
    let items: Vec<String> = Role::ALL
        .iter()
        .map(|role| {
            let meta = metadata_for(*role);
            format!("{} - {}", meta.title, meta.description)
        })
        .collect();
    let default = current
        .and_then(|c| Role::ALL.iter().position(|r| *r == c))
        .unwrap_or(1);

    let index = Select::new()
        .with_prompt("Choose your role")
        .items(&items)
        .default(default)
        .interact()?;
    Ok(Role::ALL[index])
}
