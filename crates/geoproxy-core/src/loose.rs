//! Loose reading of untyped JSON request fields.
//!
//! Browser payloads are not schema-checked. A field is "present" when it is
//! truthy, and a present field that the gateway needs as text is coerced to
//! a string instead of being rejected.

use serde_json::Value;

/// Loose truthiness: null, false, zero and the empty string are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text form of a JSON value.
///
/// Strings are returned as-is, arrays join their elements with `,` (null
/// elements become empty), objects become `[object Object]`.
pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => coerce_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// The string value of `field` in `body` when it is truthy.
pub fn truthy_string(body: &Value, field: &str) -> Option<String> {
    body.get(field).filter(|v| is_truthy(v)).map(coerce_string)
}
