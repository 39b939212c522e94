//! Passthrough sinks: observe every raw event without filtering it.

mod log_sink;
mod program_sink;

pub use log_sink::LogSink;
pub use program_sink::ProgramSink;
