//! Main daemon command: wires C1-C7 together and drives the pipeline.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use container_watchdog::broadcast::EventBroadcaster;
use container_watchdog::config::Cli;
use container_watchdog::engine::EngineClient;
use container_watchdog::notify::Notifier;
use container_watchdog::pipeline;
use container_watchdog::policy::{PolicyConfig, PolicyEngine};
use container_watchdog::sink::{LogSink, ProgramSink};
use container_watchdog::config;

/// Run the watchdog daemon. Returns `Ok(())` on clean shutdown (ctrl-c);
/// any other exit is mapped to a non-zero process exit code by `main`.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = config::bootstrap(cli)?;

    info!(socket = ?settings.socket_target, "starting container watchdog");

    let engine = EngineClient::new(settings.socket_target.clone());
    let mut broadcaster = EventBroadcaster::new();
    // `config::bootstrap` already validated that a relay is configured.
    let mail_server = settings.mail_server.as_deref().expect("validated by Settings::from_cli");
    let notifier = Notifier::new(
        mail_server,
        settings.mail_from_host.clone(),
        settings.mail_recipients.clone(),
    )?;
    let mut policy = PolicyEngine::new(PolicyConfig {
        enable_restart: settings.enable_restart,
        restart_limit: settings.restart_limit,
        restart_threshold: settings.restart_threshold,
        restart_reset_period: settings.restart_reset_period,
        name_patterns: settings.name_patterns.clone(),
    });
    let log_sink = LogSink::new(settings.print_events);
    let program_sink = ProgramSink::new(settings.program.as_deref())?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("received shutdown signal, stopping pipeline");
            signal_token.cancel();
        }
    });

    pipeline::run(
        &engine,
        &mut broadcaster,
        &mut policy,
        &notifier,
        &log_sink,
        &program_sink,
        shutdown,
    )
    .await?;

    info!("watchdog stopped");
    Ok(())
}
