//! Per-container history and semantic notifications derived from it.

mod broadcaster;
mod history;

pub use broadcaster::{EventBroadcaster, SemanticNotification, RECENT_DIE_WINDOW, RECENT_STOP_KILL_WINDOW};
pub use history::{ContainerHistory, RETENTION};
