mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // stdout carries gateway responses; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let state_dir = secretgate::config::state_dir(cli.state_dir.as_deref())?;

    match cli.command {
        Command::Init => commands::init::run(&state_dir)?,
        Command::Call { method, params } => commands::call::run(&state_dir, &method, &params)?,
        Command::Methods => commands::methods::run(),
        Command::Serve => commands::serve::run(&state_dir)?,
        Command::Set { name } => commands::set::run(&state_dir, &name)?,
    }

    Ok(())
}
