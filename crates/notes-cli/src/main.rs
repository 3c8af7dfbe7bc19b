//! Notes CLI - keep a personal note list in sync with a cloud document store.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;
mod presenter;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::show::run_show;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(()) => {}
        Err(CliError::Reported) => std::process::exit(1),
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::List { sort, search, json } => {
            run_list(profile, sort, search.as_deref(), json).await?;
        }
        Commands::Add { title, content } => run_add(profile, title, content).await?,
        Commands::Edit { id, title, content } => run_edit(profile, &id, title, content).await?,
        Commands::Delete { id } => run_delete(profile, &id).await?,
        Commands::Show { id, json } => run_show(profile, &id, json).await?,
        Commands::Watch { sort, search } => run_watch(profile, sort, search.as_deref()).await?,
        Commands::Config { command } => run_config(command, profile)?,
        Commands::Auth { command } => run_auth(command, profile).await?,
    }

    Ok(())
}
