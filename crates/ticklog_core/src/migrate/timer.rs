//! Timer state upgrade from the single-slot v1 shape.

use super::is_truthy;
use serde_json::{json, Map, Value};

/// Converts `{projectId, startTime}` into `{activeTimers: {..}}`.
///
/// The legacy shape is recognised by either singular key being present.
/// Anything else is returned unchanged.
pub fn migrate_timer_state(value: Value) -> Value {
    let object = match value {
        Value::Object(object) => object,
        other => return other,
    };
    if !object.contains_key("projectId") && !object.contains_key("startTime") {
        return Value::Object(object);
    }

    let mut active_timers = Map::new();
    if let (Some(project_id), Some(start_time)) = (object.get("projectId"), object.get("startTime"))
    {
        if is_truthy(project_id) && is_truthy(start_time) {
            let key = match project_id {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            active_timers.insert(key, start_time.clone());
        }
    }
    json!({ "activeTimers": active_timers })
}
