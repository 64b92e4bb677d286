//! Read-only queries: device and group enumeration.

use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use crate::bridge::log::{LogEntry, DEVICES_TOPIC};
use crate::bridge::{Bridge, CommandOutcome};
use crate::mesh::DeviceType;
use crate::now_ms;

/// One entry in the `devices` enumeration.
///
/// The coordinator carries its stack type and firmware revision in the
/// build/date fields; everything else is only present for real devices.
/// Key spellings are the old wire protocol's, camelCase included.
#[derive(Serialize)]
struct DeviceEntry {
    #[serde(rename = "ieeeAddr")]
    ieee_addr: String,
    #[serde(rename = "type")]
    device_type: DeviceType,
    #[serde(rename = "networkAddress")]
    network_address: u16,
    friendly_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "manufacturerID", skip_serializing_if = "Option::is_none")]
    manufacturer_id: Option<u16>,
    #[serde(rename = "manufacturerName", skip_serializing_if = "Option::is_none")]
    manufacturer_name: Option<String>,
    #[serde(rename = "powerSource", skip_serializing_if = "Option::is_none")]
    power_source: Option<String>,
    #[serde(rename = "modelID", skip_serializing_if = "Option::is_none")]
    model_id: Option<String>,
    #[serde(rename = "hardwareVersion", skip_serializing_if = "Option::is_none")]
    hardware_version: Option<u32>,
    #[serde(rename = "softwareBuildID", skip_serializing_if = "Option::is_none")]
    software_build_id: Option<String>,
    #[serde(rename = "dateCode", skip_serializing_if = "Option::is_none")]
    date_code: Option<String>,
    #[serde(rename = "lastSeen", skip_serializing_if = "Option::is_none")]
    last_seen: Option<u64>,
}

/// `devices` / `devices/get`: enumerate the live registry, coordinator
/// included. The `/get` form publishes the list on its own topic, the
/// bare form wraps it in a log envelope.
pub async fn devices(bridge: &Bridge, topic: &str) -> Result<CommandOutcome> {
    let version = bridge.coordinator.version().await?;

    let entries: Vec<DeviceEntry> = bridge
        .coordinator
        .devices()
        .into_iter()
        .map(|device| {
            if device.device_type == DeviceType::Coordinator {
                DeviceEntry {
                    ieee_addr: device.ieee_addr,
                    device_type: device.device_type,
                    network_address: device.network_address,
                    friendly_name: "Coordinator".to_string(),
                    model: None,
                    vendor: None,
                    description: None,
                    manufacturer_id: None,
                    manufacturer_name: None,
                    power_source: None,
                    model_id: None,
                    hardware_version: None,
                    software_build_id: Some(version.stack.clone()),
                    date_code: Some(version.revision.clone()),
                    last_seen: Some(now_ms()),
                }
            } else {
                let (model, vendor, description) = match &device.definition {
                    Some(def) => (
                        Some(def.model.clone()),
                        Some(def.vendor.clone()),
                        Some(def.description.clone()),
                    ),
                    None => (
                        device.model_id.clone(),
                        Some("-".to_string()),
                        Some("-".to_string()),
                    ),
                };

                DeviceEntry {
                    friendly_name: device.name().to_string(),
                    model,
                    vendor,
                    description,
                    manufacturer_id: device.manufacturer_id,
                    manufacturer_name: device.manufacturer_name,
                    power_source: device.power_source,
                    model_id: device.model_id,
                    hardware_version: device.hardware_version,
                    software_build_id: device.software_build_id,
                    date_code: device.date_code,
                    last_seen: device.last_seen,
                    ieee_addr: device.ieee_addr,
                    device_type: device.device_type,
                    network_address: device.network_address,
                }
            }
        })
        .collect();

    if topic.ends_with("/get") {
        bridge
            .bus
            .publish(DEVICES_TOPIC, serde_json::to_string(&entries)?, false)
            .await?;
    } else {
        bridge
            .log_to_bus(LogEntry::new("devices", serde_json::to_value(&entries)?))
            .await?;
    }

    Ok(CommandOutcome::Completed)
}

/// `groups`: list configured groups. The payload is built field by field
/// so the internal settings record never leaks.
pub async fn groups(bridge: &Bridge) -> Result<CommandOutcome> {
    let entries: Vec<serde_json::Value> = bridge
        .settings
        .groups()
        .into_iter()
        .map(|(id, group)| {
            json!({
                "ID": id,
                "friendly_name": group.friendly_name,
                "devices": group.devices,
            })
        })
        .collect();

    bridge
        .log_to_bus(LogEntry::new("groups", serde_json::Value::Array(entries)))
        .await?;
    Ok(CommandOutcome::Completed)
}
