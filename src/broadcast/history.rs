//! Per-container event history kept by the broadcaster.

use std::time::{Duration, Instant};

use crate::event::ContainerEvent;

/// Minimum retention window for history entries. Long enough to cover the
/// broadcaster's correlation windows; older entries are pruned
/// opportunistically on each append.
pub const RETENTION: Duration = Duration::from_secs(60);

struct StoredEvent {
    event: ContainerEvent,
    arrived_at: Instant,
}

/// Append-only (modulo opportunistic pruning) history of classified events
/// for a single container name. Invariant: every stored event's
/// `container_name` equals the name this history is keyed under (enforced
/// by the broadcaster, which is the sole writer).
#[derive(Default)]
pub struct ContainerHistory {
    events: Vec<StoredEvent>,
}

impl ContainerHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly classified event, pruning anything older than
    /// [`RETENTION`] relative to `now`.
    pub fn push(&mut self, event: ContainerEvent, now: Instant) {
        self.events.push(StoredEvent {
            event,
            arrived_at: now,
        });
        self.events
            .retain(|e| now.saturating_duration_since(e.arrived_at) <= RETENTION);
    }

    /// True if any stored event of type `event_type` arrived within
    /// `max_age` of `now`.
    pub fn has_recent(&self, event_type: &str, max_age: Duration, now: Instant) -> bool {
        self.events.iter().any(|e| {
            e.event.event_type == event_type && now.saturating_duration_since(e.arrived_at) <= max_age
        })
    }

    /// True if any stored event of a type in `event_types` arrived within
    /// `max_age` of `now`.
    pub fn has_recent_any(&self, event_types: &[&str], max_age: Duration, now: Instant) -> bool {
        self.events.iter().any(|e| {
            event_types.contains(&e.event.event_type.as_str())
                && now.saturating_duration_since(e.arrived_at) <= max_age
        })
    }
}
