//! `hsw serve` — Deploy the declared applications and serve them.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use hotswap_common::config::{AppSpec, ControllerConfig};
use hotswap_common::constants::{DEFAULT_PORT, STATUS_JSON_PATH, UPDATE_PATH};
use hotswap_common::types::AppState;
use hotswap_runtime::coordinator::Controller;
use hotswap_runtime::embedded::EmbeddedHost;
use hotswap_runtime::registry::Registry;
use hotswap_runtime::session::session_source;

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Repository URI artifacts are resolved against
    /// (file:///path or http(s)://host/base).
    #[arg(long)]
    pub repository: String,

    /// Port for the shared HTTP listener.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Use the simple (non-cryptographic) session ID source.
    #[arg(long)]
    pub simple_sessions: bool,

    /// Applications to host: `coordinate` or `contextPath=coordinate`.
    #[arg(required = true)]
    pub apps: Vec<String>,
}

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Executes the `serve` command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the repository
/// cannot be opened, or the listener cannot bind.
pub async fn execute(args: ServeArgs, data_dir: &Path) -> anyhow::Result<()> {
    let warmup_start = Instant::now();
    print_header();

    let config = ControllerConfig {
        port: args.port,
        data_dir: data_dir.to_path_buf(),
        repository: args.repository,
        apps: args
            .apps
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<AppSpec>, _>>()
            .map_err(|e| anyhow::anyhow!("{e}"))?,
        secure_sessions: !args.simple_sessions,
    };
    let registry = Registry::from_specs(&config.apps).map_err(|e| anyhow::anyhow!("{e}"))?;

    let cache = config.data_dir.join("artifacts");
    let resolver = hotswap_artifact::repository::open_repository(&config.repository, &cache)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let host = Arc::new(EmbeddedHost::new());
    let controller = Arc::new(Controller::new(
        registry,
        Arc::clone(&host) as Arc<dyn hotswap_runtime::host::ContainerHost>,
        resolver,
        session_source(config.secure_sessions),
    ));

    controller.startup().await;
    report_warmup(&controller, warmup_start);

    let router = hotswap_http::surface::router(Arc::clone(&controller), host);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("cannot bind {addr}: {e}"))?;

    eprintln!();
    eprintln!("  {CYAN}Status:{RESET}  {BOLD}http://localhost:{}/{RESET}", config.port);
    eprintln!(
        "  {CYAN}Update:{RESET}  {BOLD}http://localhost:{}{UPDATE_PATH}{RESET}",
        config.port
    );
    eprintln!(
        "  {DIM}Machine-readable status at {STATUS_JSON_PATH}; press Ctrl+C to stop.{RESET}"
    );
    eprintln!();

    tracing::info!(%addr, "listener up");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("listener failed: {e}"))?;

    eprintln!();
    eprintln!("  {GREEN}Listener stopped; deployed units die with the process.{RESET}");
    Ok(())
}

fn print_header() {
    eprintln!();
    eprintln!(
        "  {BOLD}Hotswap{RESET} {DIM}v{}{RESET}",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
}

fn report_warmup(controller: &Controller, warmup_start: Instant) {
    eprintln!(
        "  Warm-up finished in {:.1}s:",
        warmup_start.elapsed().as_secs_f64()
    );
    eprintln!();
    for row in controller.registry().status() {
        let color = if row.state == AppState::Deployed {
            GREEN
        } else {
            RED
        };
        eprintln!(
            "    {color}●{RESET} {BOLD}/{}{RESET} {} {DIM}[{} -> {}]{RESET}",
            row.context_path,
            row.state,
            row.coordinate,
            row.deployed_version.as_deref().unwrap_or("-"),
        );
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
    }
}
