//! Action predicates.
//!
//! An action is a JSON object with a string `type` field. Everything else a
//! routine yields (arrays, numbers, objects without a type) is not an action
//! and never reaches a control or the dispatch sink.

use serde_json::{Map, Value};

/// True iff `value` is a JSON object whose `type` field is a string.
pub fn is_action(value: &Value) -> bool {
    action_type(value).is_some()
}

/// True iff `value` is an action and its `type` equals `action_type`.
pub fn is_action_of_type(value: &Value, expected: &str) -> bool {
    action_type(value) == Some(expected)
}

/// The `type` of an action, or `None` if `value` is not action-shaped.
pub fn action_type(value: &Value) -> Option<&str> {
    value.as_object()?.get("type")?.as_str()
}

/// Build an action from a type and an object of extra fields.
///
/// Non-object `fields` are ignored. A `type` key inside `fields` is
/// overwritten by `action_type`.
pub fn action(action_type: impl Into<String>, fields: Value) -> Value {
    let mut map = match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    map.insert("type".to_string(), Value::String(action_type.into()));
    Value::Object(map)
}
