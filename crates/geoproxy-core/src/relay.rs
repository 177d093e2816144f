//! Upstream response bodies as relayed to the browser.
//!
//! Upstream payloads have no enforced schema. A body that parses as JSON is
//! relayed as that JSON value; anything else (HTML error pages, plain text,
//! an empty body) is relayed as the raw text.

use serde_json::Value;

/// An upstream response body, tagged by whether it parsed as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Json(Value),
    Text(String),
}

impl UpstreamBody {
    /// Classify a fully-read response body.
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => UpstreamBody::Json(value),
            Err(_) => UpstreamBody::Text(text),
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, UpstreamBody::Json(_))
    }

    /// Size of the relayed payload in bytes, for logging.
    pub fn len_hint(&self) -> usize {
        match self {
            UpstreamBody::Json(value) => value.to_string().len(),
            UpstreamBody::Text(text) => text.len(),
        }
    }
}
