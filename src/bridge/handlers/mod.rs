//! Command handlers, one module per command family.

pub mod groups;
pub mod network;
pub mod options;
pub mod query;
pub mod removal;
pub mod rename;

use serde_json::{Map, Value};

/// Parse a payload that must be a JSON object
pub(crate) fn parse_object(payload: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
