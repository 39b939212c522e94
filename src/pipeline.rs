//! The single cooperative pipeline task: every event is processed strictly
//! in arrival order through classify -> broadcast -> policy, with sinks
//! observing the raw event independently.

use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broadcast::EventBroadcaster;
use crate::engine::EngineClient;
use crate::error::{Result, WatchdogError};
use crate::event;
use crate::notify::Notifier;
use crate::policy::PolicyEngine;
use crate::sink::{LogSink, ProgramSink};

/// Runs the pipeline until the event stream ends or `shutdown` fires.
/// Returns `Ok(())` on a clean shutdown; a dropped/closed stream surfaces
/// as `Err` so the caller can map it to a non-zero exit code.
pub async fn run(
    engine: &EngineClient,
    broadcaster: &mut EventBroadcaster,
    policy: &mut PolicyEngine,
    notifier: &Notifier,
    log_sink: &LogSink,
    program_sink: &ProgramSink,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut stream = engine.open_event_stream().await?;
    info!("connected to engine event stream");

    loop {
        let raw = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("shutdown requested, stopping pipeline");
                return Ok(());
            }
            raw = stream.next_raw() => raw?,
        };

        let Some(raw) = raw else {
            warn!("engine event stream ended cleanly");
            return Err(WatchdogError::StreamClosed);
        };

        // Passthrough sinks observe every raw event regardless of whether it
        // classifies into anything the policy engine cares about.
        log_sink.handle(&raw);
        program_sink.handle(&raw);

        let Some(classified) = event::classify(&raw) else {
            debug!("event did not classify into a watched type, dropping");
            continue;
        };

        let now = Instant::now();
        let Some(notification) = broadcaster.handle_event(classified, now) else {
            continue;
        };

        policy
            .handle(notification, engine, notifier, now, Utc::now())
            .await;
    }
}
