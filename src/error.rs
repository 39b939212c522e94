//! Shared error taxonomy for the watchdog pipeline.

use thiserror::Error;

/// Errors surfaced across the C1-C4 pipeline boundary.
///
/// `TransientNotifierError` from the design is deliberately absent here: the
/// notifier swallows its own transport errors and never returns one across
/// this boundary (see `notify::Notifier::send`).
#[derive(Error, Debug)]
pub enum WatchdogError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("engine stream closed")]
    StreamClosed,

    #[error("malformed event: {0}")]
    MalformedEvent(String),
}

pub type Result<T> = std::result::Result<T, WatchdogError>;
