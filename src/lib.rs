//! meshbridge - legacy-compatibility command router for a Zigbee-to-MQTT
//! gateway.
//!
//! Bus messages on the deprecated `<base>/bridge/config/*` namespace are
//! translated into administrative actions against the settings store and
//! the mesh coordinator; mesh lifecycle events are translated into
//! `<base>/bridge/log` entries for consumers that have not migrated off
//! the old wire protocol.

pub mod bridge;
pub mod logging;
pub mod mesh;
pub mod mqtt;
pub mod settings;
pub mod state;

use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
