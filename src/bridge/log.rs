//! Outbound payload envelope for the legacy log topic.

use serde::Serialize;
use serde_json::Value;

/// Log envelope topic, relative to the base topic
pub const LOG_TOPIC: &str = "bridge/log";
/// Retained status snapshot topic
pub const CONFIG_TOPIC: &str = "bridge/config";
/// Direct device enumeration response topic (`devices/get` only)
pub const DEVICES_TOPIC: &str = "bridge/config/devices";

/// The `{type, message, meta?}` envelope every log-channel payload uses.
///
/// Struct fields serialize in declaration order and `serde_json` maps
/// serialize with sorted keys, so key order is deterministic either way.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl LogEntry {
    pub fn new(kind: &str, message: impl Into<Value>) -> Self {
        Self {
            kind: kind.to_string(),
            message: message.into(),
            meta: None,
        }
    }

    pub fn with_meta(kind: &str, message: impl Into<Value>, meta: Value) -> Self {
        Self {
            kind: kind.to_string(),
            message: message.into(),
            meta: Some(meta),
        }
    }
}
