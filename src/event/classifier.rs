//! Normalizes raw engine events into `ContainerEvent`s.

use serde_json::Value;

use crate::event::raw::extract_fields;

/// The observed set of statuses the rest of the pipeline cares about.
pub const WATCHED_TYPES: &[&str] = &[
    "die",
    "stop",
    "kill",
    "start",
    "health_status: healthy",
    "health_status: unhealthy",
];

/// A classified engine event: one of the watched container lifecycle statuses.
#[derive(Debug, Clone)]
pub struct ContainerEvent {
    pub event_type: String,
    pub container_id: String,
    pub container_name: String,
    pub service_name: Option<String>,
    pub time: i64,
    pub raw: Value,
}

/// Classify a raw event. Returns `None` for events lacking `status`, or whose
/// status is outside the observed set.
pub fn classify(raw: &Value) -> Option<ContainerEvent> {
    let fields = extract_fields(raw)?;

    if !WATCHED_TYPES.contains(&fields.status) {
        return None;
    }

    Some(ContainerEvent {
        event_type: fields.status.to_string(),
        container_id: fields.container_id.to_string(),
        container_name: fields.container_name.to_string(),
        service_name: fields.service_name.map(str::to_string),
        time: fields.time,
        raw: raw.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn die_event(name: &str) -> Value {
        json!({
            "status": "die",
            "id": "abc123",
            "time": 1000,
            "Actor": { "Attributes": { "name": name, "com.docker.compose.service": "web" } }
        })
    }

    #[test]
    fn classifies_watched_status() {
        let ev = classify(&die_event("web-1")).unwrap();
        assert_eq!(ev.event_type, "die");
        assert_eq!(ev.container_name, "web-1");
        assert_eq!(ev.service_name.as_deref(), Some("web"));
    }

    #[test]
    fn drops_unwatched_status() {
        let raw = json!({
            "status": "exec_create",
            "id": "abc123",
            "time": 1000,
            "Actor": { "Attributes": { "name": "web-1" } }
        });
        assert!(classify(&raw).is_none());
    }

    #[test]
    fn drops_events_without_status() {
        let raw = json!({ "Type": "network", "time": 1000 });
        assert!(classify(&raw).is_none());
    }
}
