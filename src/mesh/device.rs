//! Device, group and entity types for the live mesh registry.

use serde::Serialize;

/// Capability definition resolved from the device database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub model: String,
    pub vendor: String,
    pub description: String,
}

/// Role of a device on the mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceType {
    Coordinator,
    Router,
    EndDevice,
}

/// Live-registry view of a joined device.
///
/// This is a transient per-call snapshot; nothing caches it across
/// commands.
#[derive(Debug, Clone)]
pub struct Device {
    pub ieee_addr: String,
    pub network_address: u16,
    pub device_type: DeviceType,
    /// Friendly name from settings when configured
    pub friendly_name: Option<String>,
    pub definition: Option<Definition>,
    pub model_id: Option<String>,
    pub manufacturer_id: Option<u16>,
    pub manufacturer_name: Option<String>,
    pub power_source: Option<String>,
    pub hardware_version: Option<u32>,
    pub software_build_id: Option<String>,
    pub date_code: Option<String>,
    /// Milliseconds since Unix epoch
    pub last_seen: Option<u64>,
}

impl Device {
    /// Display name: the friendly name, falling back to the ieee address
    pub fn name(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or(&self.ieee_addr)
    }
}

/// Live view of a network-level group
#[derive(Debug, Clone)]
pub struct GroupHandle {
    pub id: u16,
    pub friendly_name: String,
    /// Member ieee addresses
    pub members: Vec<String>,
}

/// Resolution result: either a device or a group, never both
#[derive(Debug, Clone)]
pub enum Entity {
    Device(Device),
    Group(GroupHandle),
}

impl Entity {
    pub fn friendly_name(&self) -> &str {
        match self {
            Entity::Device(device) => device.name(),
            Entity::Group(group) => &group.friendly_name,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Entity::Group(_))
    }
}
