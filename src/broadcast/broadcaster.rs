//! Correlates classified events into semantic notifications within small
//! time windows.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use crate::broadcast::history::ContainerHistory;
use crate::event::ContainerEvent;

/// Window within which at least one `die` must have occurred for a
/// `die`/`became_unhealthy` event to be eligible for notification.
pub const RECENT_DIE_WINDOW: Duration = Duration::from_secs(5);

/// Window within which a `stop`/`kill` reclassifies a `die` as operator
/// initiated.
pub const RECENT_STOP_KILL_WINDOW: Duration = Duration::from_secs(12);

/// Higher-level notification derived from a classified event, delivered to
/// subscribers (here: the restart policy engine) in place of the raw status
/// string.
#[derive(Debug, Clone)]
pub enum SemanticNotification {
    ContainerStarted { name: String, raw: Value },
    BecameHealthy { name: String, raw: Value },
    BecameUnhealthy { name: String, raw: Value },
    ContainerDead { name: String, raw: Value },
    StoppedByHand { name: String, raw: Value },
}

impl SemanticNotification {
    pub fn container_name(&self) -> &str {
        match self {
            SemanticNotification::ContainerStarted { name, .. }
            | SemanticNotification::BecameHealthy { name, .. }
            | SemanticNotification::BecameUnhealthy { name, .. }
            | SemanticNotification::ContainerDead { name, .. }
            | SemanticNotification::StoppedByHand { name, .. } => name,
        }
    }
}

/// Owns per-container history and derives semantic notifications from
/// classified events. Confined to the single pipeline task: no internal
/// locking is needed.
#[derive(Default)]
pub struct EventBroadcaster {
    histories: HashMap<String, ContainerHistory>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `event` and derive a semantic notification, if any. `now` is a
    /// monotonic instant used for all window math; the event's own
    /// wall-clock `time` field is display-only and never drives a decision.
    pub fn handle_event(
        &mut self,
        event: ContainerEvent,
        now: Instant,
    ) -> Option<SemanticNotification> {
        let name = event.container_name.clone();
        let raw = event.raw.clone();
        let event_type = event.event_type.clone();

        let history = self.histories.entry(name.clone()).or_default();
        history.push(event, now);

        match event_type.as_str() {
            "start" => Some(SemanticNotification::ContainerStarted { name, raw }),
            "health_status: healthy" => Some(SemanticNotification::BecameHealthy { name, raw }),
            "health_status: unhealthy" => {
                match warrant(history, now) {
                    Warrant::Notify => Some(SemanticNotification::BecameUnhealthy { name, raw }),
                    Warrant::StoppedByHand => Some(SemanticNotification::StoppedByHand { name, raw }),
                    Warrant::Suppressed => {
                        debug!(container = %name, "unhealthy event without a recent die, not notifying");
                        None
                    }
                }
            }
            "die" => match warrant(history, now) {
                Warrant::Notify => Some(SemanticNotification::ContainerDead { name, raw }),
                Warrant::StoppedByHand => Some(SemanticNotification::StoppedByHand { name, raw }),
                Warrant::Suppressed => {
                    debug!(container = %name, "die event without a recent die in window, not notifying");
                    None
                }
            },
            // stop/kill influence the warrant rule above but never notify on
            // their own.
            "stop" | "kill" => None,
            _ => None,
        }
    }
}

enum Warrant {
    Notify,
    StoppedByHand,
    Suppressed,
}

fn warrant(history: &ContainerHistory, now: Instant) -> Warrant {
    if !history.has_recent("die", RECENT_DIE_WINDOW, now) {
        return Warrant::Suppressed;
    }
    if history.has_recent_any(&["stop", "kill"], RECENT_STOP_KILL_WINDOW, now) {
        return Warrant::StoppedByHand;
    }
    Warrant::Notify
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, name: &str) -> ContainerEvent {
        ContainerEvent {
            event_type: event_type.to_string(),
            container_id: "cid".to_string(),
            container_name: name.to_string(),
            service_name: None,
            time: 0,
            raw: json!({ "status": event_type }),
        }
    }

    #[test]
    fn operator_stop_suppresses_restart_notification() {
        let mut b = EventBroadcaster::new();
        let t0 = Instant::now();

        assert!(b.handle_event(event("stop", "web-1"), t0).is_none());
        let notif = b
            .handle_event(event("die", "web-1"), t0 + Duration::from_secs(1))
            .unwrap();
        assert!(matches!(notif, SemanticNotification::StoppedByHand { .. }));
    }

    #[test]
    fn bare_die_notifies_container_dead() {
        let mut b = EventBroadcaster::new();
        let t0 = Instant::now();
        let notif = b.handle_event(event("die", "web-1"), t0).unwrap();
        assert!(matches!(notif, SemanticNotification::ContainerDead { .. }));
    }

    #[test]
    fn start_always_notifies_regardless_of_history() {
        let mut b = EventBroadcaster::new();
        let t0 = Instant::now();
        let notif = b.handle_event(event("start", "web-1"), t0).unwrap();
        assert!(matches!(notif, SemanticNotification::ContainerStarted { .. }));
    }

    #[test]
    fn stop_kill_outside_window_does_not_suppress() {
        let mut b = EventBroadcaster::new();
        let t0 = Instant::now();
        b.handle_event(event("stop", "web-1"), t0);
        let notif = b
            .handle_event(
                event("die", "web-1"),
                t0 + Duration::from_secs(13),
            )
            .unwrap();
        assert!(matches!(notif, SemanticNotification::ContainerDead { .. }));
    }

    #[test]
    fn unhealthy_without_recent_die_is_suppressed_entirely() {
        let mut b = EventBroadcaster::new();
        let t0 = Instant::now();
        assert!(b.handle_event(event("health_status: unhealthy", "web-1"), t0).is_none());
    }

    #[test]
    fn unhealthy_with_recent_die_notifies() {
        let mut b = EventBroadcaster::new();
        let t0 = Instant::now();
        b.handle_event(event("die", "web-1"), t0);
        let notif = b
            .handle_event(
                event("health_status: unhealthy", "web-1"),
                t0 + Duration::from_secs(2),
            )
            .unwrap();
        assert!(matches!(notif, SemanticNotification::BecameUnhealthy { .. }));
    }

    #[test]
    fn separate_containers_do_not_interfere() {
        let mut b = EventBroadcaster::new();
        let t0 = Instant::now();
        b.handle_event(event("stop", "web-1"), t0);
        let notif = b.handle_event(event("die", "web-2"), t0).unwrap();
        assert!(matches!(notif, SemanticNotification::ContainerDead { .. }));
    }
}
