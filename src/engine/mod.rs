//! Engine client: opens the event stream and issues restart requests.

mod client;
mod framer;

pub use client::{EngineClient, EventStream, SocketTarget};
pub use framer::ChunkedFramer;
