//! Runtime per-device state snapshots, keyed by ieee address.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

/// In-memory cache of the last published state per device.
///
/// The command router only ever deletes entries (device removal); the
/// gateway core that owns state publication writes them.
#[derive(Default)]
pub struct StateStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ieee_addr: &str) -> Option<Value> {
        self.entries.read().get(ieee_addr).cloned()
    }

    pub fn set(&self, ieee_addr: &str, state: Value) {
        self.entries.write().insert(ieee_addr.to_string(), state);
    }

    /// Drop a device's cached state, returning whether one existed
    pub fn remove(&self, ieee_addr: &str) -> bool {
        self.entries.write().remove(ieee_addr).is_some()
    }

    pub fn contains(&self, ieee_addr: &str) -> bool {
        self.entries.read().contains_key(ieee_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_get_remove() {
        let store = StateStore::new();
        store.set("0x01", json!({"state": "ON"}));
        assert!(store.contains("0x01"));
        assert_eq!(store.get("0x01"), Some(json!({"state": "ON"})));
        assert!(store.remove("0x01"));
        assert!(!store.remove("0x01"));
        assert!(store.get("0x01").is_none());
    }
}
