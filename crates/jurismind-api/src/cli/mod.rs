//! CLI command definitions and dispatch for the `jmind` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod conversations;
pub mod profile;
pub mod roles;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

use jurismind_types::role::Role;

/// Role-adaptive legal guidance in your terminal.
#[derive(Parser)]
#[command(name = "jmind", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session.
    Chat {
        /// Open a specific conversation by ID.
        #[arg(long, conflicts_with = "new")]
        conversation: Option<Uuid>,

        /// Start a fresh conversation instead of resuming the latest one.
        #[arg(long)]
        new: bool,
    },

    /// List your conversations, most recent activity first.
    #[command(alias = "ls")]
    Conversations,

    /// Show the role catalogue, or a single role.
    Roles {
        /// Role to display (lawyer, citizen, student).
        role: Option<Role>,

        /// Print the behavior directive sent to the model.
        #[arg(long, requires = "role")]
        directive: bool,
    },

    /// Manage the local profile (who you are and which role you use).
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Create or update the profile.
    Set {
        /// Role to use for new conversations (prompted when omitted).
        #[arg(long)]
        role: Option<Role>,

        /// Display label, usually an email address.
        #[arg(long)]
        label: Option<String>,
    },

    /// Show the current profile.
    Show,
}
