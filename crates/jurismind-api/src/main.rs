//! JurisMind CLI entry point.
//!
//! Binary name: `jmind`
//!
//! Parses CLI arguments, initializes tracing, the database and the
//! configured generation backend, then dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use jurismind_observe::tracing_setup::{filter_for_verbosity, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, ProfileCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(filter_for_verbosity(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Commands that need no database or profile
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "jmind", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Roles { role, directive } => {
            return cli::roles::show_roles(*role, *directive, cli.json);
        }
        _ => {}
    }

    let state = AppState::init().await?;

    match cli.command {
        Commands::Chat { conversation, new } => {
            cli::chat::loop_runner::run_chat_loop(&state, conversation, new).await?;
        }

        Commands::Conversations => {
            cli::conversations::list_conversations(&state, cli.json).await?;
        }

        Commands::Profile { action } => match action {
            ProfileCommand::Set { role, label } => {
                cli::profile::set_profile(&state.data_dir, role, label, cli.json).await?;
            }
            ProfileCommand::Show => {
                cli::profile::show_profile(&state.data_dir, cli.json).await?;
            }
        },

        Commands::Completions { .. } | Commands::Roles { .. } => {}
    }

    Ok(())
}
