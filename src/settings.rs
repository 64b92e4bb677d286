//! Settings store for devices, groups, ban/whitelist lists and advanced
//! options, with optional YAML persistence.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Errors raised by settings mutations
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("friendly name '{0}' is already in use")]
    NameTaken(String),
    #[error("no device or group named '{0}'")]
    UnknownEntity(String),
    #[error("group id {0} is already in use")]
    GroupIdTaken(u16),
}

/// Wire format used when reporting device last-seen timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LastSeenFormat {
    #[default]
    #[serde(rename = "disable")]
    Disable,
    #[serde(rename = "ISO_8601")]
    Iso8601,
    #[serde(rename = "epoch")]
    Epoch,
    #[serde(rename = "ISO_8601_local")]
    Iso8601Local,
}

impl LastSeenFormat {
    /// Accepted wire spellings, in the order they are reported to users
    pub const ALLOWED: [&'static str; 4] = ["disable", "ISO_8601", "epoch", "ISO_8601_local"];

    /// Parse the exact wire spelling; anything else is rejected
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "disable" => Some(Self::Disable),
            "ISO_8601" => Some(Self::Iso8601),
            "epoch" => Some(Self::Epoch),
            "ISO_8601_local" => Some(Self::Iso8601Local),
            _ => None,
        }
    }
}

/// Per-device configuration record, keyed by ieee address
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,
}

/// Per-group configuration record, keyed by numeric group id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupSettings {
    pub friendly_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,
}

/// Advanced gateway options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvancedSettings {
    #[serde(default)]
    pub last_seen: LastSeenFormat,
    #[serde(default)]
    pub elapsed: bool,
}

/// On-disk shape of the settings store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsData {
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceSettings>,
    #[serde(default)]
    pub groups: BTreeMap<u16, GroupSettings>,
    #[serde(default)]
    pub ban: Vec<String>,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub advanced: AdvancedSettings,
}

/// Settings-level view of a configured device or group
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsEntity {
    Device {
        ieee_addr: String,
        friendly_name: String,
    },
    Group {
        id: u16,
        friendly_name: String,
        devices: Vec<String>,
    },
}

impl SettingsEntity {
    pub fn friendly_name(&self) -> &str {
        match self {
            Self::Device { friendly_name, .. } => friendly_name,
            Self::Group { friendly_name, .. } => friendly_name,
        }
    }

    /// Identifier recorded in the ban/whitelist lists
    pub fn id_string(&self) -> String {
        match self {
            Self::Device { ieee_addr, .. } => ieee_addr.clone(),
            Self::Group { id, .. } => id.to_string(),
        }
    }
}

/// In-memory settings store with optional YAML persistence.
///
/// Durable storage is best effort: a failed write is logged and the
/// in-memory state stays authoritative for the rest of the session.
pub struct Settings {
    data: RwLock<SettingsData>,
    path: Option<PathBuf>,
}

impl Settings {
    /// Create a purely in-memory store (used by tests and the simulator)
    pub fn new(data: SettingsData) -> Self {
        Self {
            data: RwLock::new(data),
            path: None,
        }
    }

    /// Load from a YAML file, starting empty when the file does not exist
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_yaml::from_str(&raw)
                .with_context(|| format!("failed to parse settings file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SettingsData::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };

        Ok(Self {
            data: RwLock::new(data),
            path: Some(path),
        })
    }

    fn persist(&self, data: &SettingsData) {
        let Some(path) = &self.path else {
            return;
        };

        let result = serde_yaml::to_string(data)
            .map_err(anyhow::Error::from)
            .and_then(|raw| std::fs::write(path, raw).map_err(anyhow::Error::from));

        if let Err(e) = result {
            error!("Failed to persist settings to {}: {e:#}", path.display());
        }
    }

    pub fn advanced(&self) -> AdvancedSettings {
        self.data.read().advanced.clone()
    }

    pub fn set_last_seen(&self, format: LastSeenFormat) {
        let mut data = self.data.write();
        data.advanced.last_seen = format;
        self.persist(&data);
    }

    pub fn set_elapsed(&self, elapsed: bool) {
        let mut data = self.data.write();
        data.advanced.elapsed = elapsed;
        self.persist(&data);
    }

    /// Configured record for a device, by ieee address
    pub fn device(&self, ieee_addr: &str) -> Option<DeviceSettings> {
        self.data.read().devices.get(ieee_addr).cloned()
    }

    pub fn group(&self, id: u16) -> Option<GroupSettings> {
        self.data.read().groups.get(&id).cloned()
    }

    pub fn group_by_name(&self, name: &str) -> Option<(u16, GroupSettings)> {
        self.data
            .read()
            .groups
            .iter()
            .find(|(_, g)| g.friendly_name == name)
            .map(|(id, g)| (*id, g.clone()))
    }

    pub fn groups(&self) -> Vec<(u16, GroupSettings)> {
        self.data
            .read()
            .groups
            .iter()
            .map(|(id, g)| (*id, g.clone()))
            .collect()
    }

    /// Resolve a free-form identifier (friendly name, ieee address or
    /// numeric group id) against the configured records
    pub fn entity(&self, id: &str) -> Option<SettingsEntity> {
        let data = self.data.read();

        if let Some(device) = data.devices.get(id) {
            return Some(SettingsEntity::Device {
                ieee_addr: id.to_string(),
                friendly_name: device.friendly_name.clone().unwrap_or_else(|| id.to_string()),
            });
        }

        if let Some((addr, device)) = data
            .devices
            .iter()
            .find(|(_, d)| d.friendly_name.as_deref() == Some(id))
        {
            return Some(SettingsEntity::Device {
                ieee_addr: addr.clone(),
                friendly_name: device
                    .friendly_name
                    .clone()
                    .unwrap_or_else(|| addr.clone()),
            });
        }

        if let Some((gid, group)) = data.groups.iter().find(|(_, g)| g.friendly_name == id) {
            return Some(SettingsEntity::Group {
                id: *gid,
                friendly_name: group.friendly_name.clone(),
                devices: group.devices.clone(),
            });
        }

        if let Ok(gid) = id.parse::<u16>() {
            if let Some(group) = data.groups.get(&gid) {
                return Some(SettingsEntity::Group {
                    id: gid,
                    friendly_name: group.friendly_name.clone(),
                    devices: group.devices.clone(),
                });
            }
        }

        None
    }

    /// Friendly names are unique across the device and group namespaces
    pub fn friendly_name_taken(&self, name: &str) -> bool {
        let data = self.data.read();
        data.devices
            .values()
            .any(|d| d.friendly_name.as_deref() == Some(name))
            || data.groups.values().any(|g| g.friendly_name == name)
    }

    /// Register (or update) a device record
    pub fn add_device(&self, ieee_addr: &str, friendly_name: Option<&str>) {
        let mut data = self.data.write();
        let record = data.devices.entry(ieee_addr.to_string()).or_default();
        if let Some(name) = friendly_name {
            record.friendly_name = Some(name.to_string());
        }
        self.persist(&data);
    }

    /// Rename a device or group, enforcing cross-namespace uniqueness
    pub fn rename(&self, from: &str, to: &str) -> Result<(), SettingsError> {
        if self.friendly_name_taken(to) {
            return Err(SettingsError::NameTaken(to.to_string()));
        }

        let mut data = self.data.write();

        let device_addr = data
            .devices
            .iter()
            .find(|(_, d)| d.friendly_name.as_deref() == Some(from))
            .map(|(addr, _)| addr.clone());
        if let Some(addr) = device_addr {
            if let Some(device) = data.devices.get_mut(&addr) {
                device.friendly_name = Some(to.to_string());
            }
            self.persist(&data);
            return Ok(());
        }

        let group_id = data
            .groups
            .iter()
            .find(|(_, g)| g.friendly_name == from)
            .map(|(id, _)| *id);
        if let Some(gid) = group_id {
            if let Some(group) = data.groups.get_mut(&gid) {
                group.friendly_name = to.to_string();
            }
            self.persist(&data);
            return Ok(());
        }

        Err(SettingsError::UnknownEntity(from.to_string()))
    }

    /// Merge command-supplied options into an entity's record
    pub fn merge_entity_options(
        &self,
        entity: &SettingsEntity,
        options: &BTreeMap<String, serde_json::Value>,
    ) {
        let mut data = self.data.write();
        match entity {
            SettingsEntity::Device { ieee_addr, .. } => {
                let record = data.devices.entry(ieee_addr.clone()).or_default();
                record
                    .options
                    .extend(options.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            SettingsEntity::Group { id, .. } => {
                if let Some(record) = data.groups.get_mut(id) {
                    record
                        .options
                        .extend(options.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }
        self.persist(&data);
    }

    /// Register a group, allocating the next free id when none is given
    pub fn add_group(&self, name: &str, id: Option<u16>) -> Result<u16, SettingsError> {
        if self.friendly_name_taken(name) {
            return Err(SettingsError::NameTaken(name.to_string()));
        }

        let mut data = self.data.write();

        let id = match id {
            Some(id) => {
                if data.groups.contains_key(&id) {
                    return Err(SettingsError::GroupIdTaken(id));
                }
                id
            }
            None => (1..).find(|id| !data.groups.contains_key(id)).unwrap_or(1),
        };

        data.groups.insert(
            id,
            GroupSettings {
                friendly_name: name.to_string(),
                ..Default::default()
            },
        );
        self.persist(&data);
        Ok(id)
    }

    /// Delete a group record, returning whether one existed
    pub fn remove_group(&self, id: u16) -> bool {
        let mut data = self.data.write();
        let removed = data.groups.remove(&id).is_some();
        if removed {
            self.persist(&data);
        }
        removed
    }

    /// Delete a device record and drop it from any group member lists
    pub fn remove_device(&self, ieee_addr: &str) -> bool {
        let mut data = self.data.write();
        let removed = data.devices.remove(ieee_addr).is_some();
        for group in data.groups.values_mut() {
            group.devices.retain(|addr| addr != ieee_addr);
        }
        if removed {
            self.persist(&data);
        }
        removed
    }

    /// Append an address to the persistent ban list
    pub fn ban_device(&self, ieee_addr: &str) {
        let mut data = self.data.write();
        if !data.ban.iter().any(|a| a == ieee_addr) {
            data.ban.push(ieee_addr.to_string());
            self.persist(&data);
        }
    }

    /// Mark an entity id as whitelisted
    pub fn whitelist(&self, id: &str) {
        let mut data = self.data.write();
        if !data.whitelist.iter().any(|a| a == id) {
            data.whitelist.push(id.to_string());
            self.persist(&data);
        }
    }

    pub fn banned(&self) -> Vec<String> {
        self.data.read().ban.clone()
    }

    pub fn whitelisted(&self) -> Vec<String> {
        self.data.read().whitelist.clone()
    }
}
