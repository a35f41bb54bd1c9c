//! CLI command definitions and dispatch.

pub mod resolve;
pub mod serve;

use clap::{Parser, Subcommand};

/// Hotswap — hot-redeploy controller for a multi-tenant application host.
#[derive(Parser, Debug)]
#[command(name = "hsw", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Base directory for cached artifacts and controller state.
    #[arg(long, global = true)]
    pub data_dir: Option<std::path::PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deploy the declared applications and serve them until Ctrl+C.
    Serve(serve::ServeArgs),
    /// Resolve the declared applications once and report the versions.
    Resolve(resolve::ResolveArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| hotswap_common::constants::data_dir().clone());
    match cli.command {
        Command::Serve(args) => serve::execute(args, &data_dir).await,
        Command::Resolve(args) => resolve::execute(args, &data_dir).await,
    }
}
