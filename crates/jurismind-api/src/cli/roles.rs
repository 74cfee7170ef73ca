//! Role catalogue display: `jmind roles [<role>] [--directive]`.
//!
//! Also hosts the role card used by the chat welcome screen, so the
//! accent and icon keys are mapped to terminal styling in one place.

use anyhow::Result;
use console::{Color, style};

use jurismind_core::role::{directive_for, metadata_for};
use jurismind_types::role::{Role, RoleDisplayMetadata};

/// Terminal colour for a role's accent key.
pub fn accent_color(accent: &str) -> Color {
    match accent {
        "lawyer" => Color::Blue,
        "citizen" => Color::Green,
        "student" => Color::Magenta,
        _ => Color::Cyan,
    }
}

/// Glyph for a role's icon key.
pub fn icon_glyph(icon: &str) -> &'static str {
    match icon {
        "Scale" => "⚖",
        "Users" => "👥",
        "GraduationCap" => "🎓",
        _ => "*",
    }
}

/// Print the styled card for a role: title, description, feature bullets.
pub fn print_role_card(meta: &RoleDisplayMetadata) {
    let accent = accent_color(meta.accent);
    println!();
    println!(
        "  {} {}",
        icon_glyph(meta.icon),
        style(meta.title).fg(accent).bold()
    );
    println!("  {}", style(meta.description).dim());
    println!();
    for feature in meta.features {
        println!("    {} {}", style("•").fg(accent), feature);
    }
    println!();
}

/// Show one role or the whole catalogue.
pub fn show_roles(role: Option<Role>, directive: bool, json: bool) -> Result<()> {
    let roles: Vec<Role> = match role {
        Some(role) => vec![role],
        None => Role::ALL.to_vec(),
    };

    if json {
        let entries: Vec<serde_json::Value> = roles
            .iter()
            .map(|role| {
                let mut entry = serde_json::json!({
                    "role": role.as_str(),
                    "metadata": metadata_for(*role),
                });
                if directive {
                    entry["directive"] = serde_json::Value::from(directive_for(*role));
                }
                entry
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for role in &roles {
        print_role_card(metadata_for(*role));
        if directive {
            println!("  {}", style("Directive:").bold());
            println!();
            for line in directive_for(*role).lines() {
                println!("    {}", style(line).dim());
            }
            println!();
        } else {
            println!(
                "  {}",
                style(format!("jmind profile set --role {role}")).yellow()
            );
        }
    }
    println!();

    Ok(())
}
