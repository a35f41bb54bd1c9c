//! `hsw resolve` — One-shot resolution report for declared applications.

use std::path::Path;

use clap::Args;
use hotswap_common::config::AppSpec;
use hotswap_runtime::registry::Registry;

/// Arguments for the `resolve` command.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Repository URI artifacts are resolved against
    /// (file:///path or http(s)://host/base).
    #[arg(long)]
    pub repository: String,

    /// Applications to resolve: `coordinate` or `contextPath=coordinate`.
    #[arg(required = true)]
    pub apps: Vec<String>,
}

/// Executes the `resolve` command.
///
/// Resolves every declared coordinate once and prints the outcome per
/// application. A failed record is reported, not fatal.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the repository
/// cannot be opened.
pub async fn execute(args: ResolveArgs, data_dir: &Path) -> anyhow::Result<()> {
    let specs = args
        .apps
        .iter()
        .map(|s| s.parse())
        .collect::<Result<Vec<AppSpec>, _>>()
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let registry = Registry::from_specs(&specs).map_err(|e| anyhow::anyhow!("{e}"))?;

    let cache = data_dir.join("artifacts");
    let resolver = hotswap_artifact::repository::open_repository(&args.repository, &cache)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let failures = registry.resolve_all(resolver.as_ref()).await;

    println!(
        "{:<16} {:<28} {:<12} {:<6} {:<24}",
        "CONTEXT", "COORDINATE", "RESOLVED", "DEPS", "NOTE"
    );
    for row in registry.status() {
        println!(
            "{:<16} {:<28} {:<12} {:<6} {:<24}",
            row.context_path,
            row.coordinate,
            row.resolved_version.as_deref().unwrap_or("-"),
            row.dependency_count,
            row.resolution_error.as_deref().unwrap_or(""),
        );
    }

    if failures > 0 {
        println!();
        println!("{failures} application(s) did not resolve.");
    }
    Ok(())
}
