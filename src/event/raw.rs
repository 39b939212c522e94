//! Accessors over the engine's loosely-typed raw event object.

use serde_json::Value;

/// Extracted fields pulled out of a raw engine event, used by the classifier.
pub struct RawEventFields<'a> {
    pub status: &'a str,
    pub container_id: &'a str,
    pub time: i64,
    pub container_name: &'a str,
    pub service_name: Option<&'a str>,
}

/// Pull the fields the classifier needs out of a raw JSON event object.
///
/// Returns `None` when `status` is absent (the event is non-container noise,
/// e.g. a network event).
pub fn extract_fields(raw: &Value) -> Option<RawEventFields<'_>> {
    let status = raw.get("status")?.as_str()?;
    let container_id = raw.get("id").and_then(Value::as_str).unwrap_or_default();
    let time = raw.get("time").and_then(Value::as_i64).unwrap_or(0);

    let attrs = raw.pointer("/Actor/Attributes");
    let container_name = attrs
        .and_then(|a| a.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let service_name = attrs
        .and_then(|a| a.get("com.docker.compose.service"))
        .or_else(|| attrs.and_then(|a| a.get("com.docker.swarm.service.name")))
        .and_then(Value::as_str);

    Some(RawEventFields {
        status,
        container_id,
        time,
        container_name,
        service_name,
    })
}
