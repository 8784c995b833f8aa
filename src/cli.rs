use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "secretgate",
    about = "Gateway for an agent's user secrets and MCP server config.",
    version
)]
pub struct Cli {
    /// State directory (default: $SECRETGATE_STATE_DIR, then ./.secretgate).
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write config.toml with a fresh salt for the encrypted-file backend.
    Init,

    /// Dispatch a single gateway method and print the response.
    Call {
        /// Method name, e.g. `secrets.list`.
        method: String,

        /// Method params as a JSON object.
        #[arg(default_value = "{}")]
        params: String,
    },

    /// List the gateway methods this build registers.
    Methods,

    /// Read JSON requests from stdin, one per line; write one response per line.
    Serve,

    /// Add or update a secret (value is prompted interactively).
    Set {
        /// Secret name, e.g. GOOGLE_API_KEY.
        name: String,
    },
}
