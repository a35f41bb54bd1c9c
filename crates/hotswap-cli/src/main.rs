//! # hsw — Hotswap CLI
//!
//! Hot-redeploy controller for a multi-tenant application host.
//! Single binary for serving declared applications and inspecting how
//! their coordinates resolve.

mod commands;

use clap::Parser;

use crate::commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    commands::execute(cli).await
}
