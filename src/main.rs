//! Container-lifecycle watchdog: observes a container engine's event stream
//! and decides, per container, whether to restart and whether to notify.

use anyhow::Result;
use clap::Parser;
use tracing::error;

use container_watchdog::config::Cli;

mod cmd;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    let default_filter = format!("container_watchdog={log_level}");
    let filter = std::env::var("LOG_CFG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_filter);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .init();

    if let Err(e) = cmd::root::run(cli).await {
        error!(error = %e, "watchdog exited with an error");
        std::process::exit(1);
    }

    Ok(())
}
