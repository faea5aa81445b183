//! Shallow structural check applied before a payload is trusted.

use serde_json::Value;

/// True when `value` has the top-level shape of a preload snapshot.
///
/// Only the container types are checked; nested entries are left to typed
/// decoding.
pub fn validate_preload_data(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };

    if !obj.get("config").is_some_and(Value::is_object) {
        return false;
    }
    if !obj.get("maintenanceList").is_some_and(Value::is_array) {
        return false;
    }
    if let Some(incident) = obj.get("incident") {
        if !(incident.is_object() || incident.is_null()) {
            return false;
        }
    }
    if let Some(groups) = obj.get("publicGroupList") {
        if !groups.is_array() {
            return false;
        }
    }

    true
}
