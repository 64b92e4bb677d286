//! Shared removal routine behind `remove`, `force_remove` and `ban`.

use anyhow::Result;
use serde_json::Value;
use tracing::info;

use crate::bridge::log::LogEntry;
use crate::bridge::{Bridge, BridgeEvent, CommandOutcome};
use crate::mesh::Entity;

/// The three flavors of device removal. Force skips the network and
/// removes from the coordinator database only; ban additionally records
/// the address in the persistent ban list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalAction {
    Remove,
    ForceRemove,
    Ban,
}

impl RemovalAction {
    /// Past-tense tag used in log envelope types (`device_<tag>`)
    fn tag(self) -> &'static str {
        match self {
            Self::Remove => "removed",
            Self::ForceRemove => "force_removed",
            Self::Ban => "banned",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Remove => "remove",
            Self::ForceRemove => "force remove",
            Self::Ban => "ban",
        }
    }

    fn progressing(self) -> &'static str {
        match self {
            Self::Remove => "Removing",
            Self::ForceRemove => "Force removing",
            Self::Ban => "Banning",
        }
    }
}

/// Remove a device, by any of the three actions.
///
/// A ban holds even when the identifier does not resolve or the driver
/// fails: the trimmed identifier (or the ieee address, once known) is
/// appended to the ban list regardless of the removal outcome.
pub async fn remove(bridge: &Bridge, action: RemovalAction, payload: &str) -> Result<CommandOutcome> {
    let id = payload.trim();

    let device = match bridge.coordinator.resolve_entity(id) {
        Some(Entity::Device(device)) => device,
        _ => {
            if action == RemovalAction::Ban {
                bridge.settings.ban_device(id);
            }
            bridge
                .log_to_bus(LogEntry::new(
                    &format!("device_{}_failed", action.tag()),
                    Value::String(id.to_string()),
                ))
                .await?;
            return Ok(CommandOutcome::rejected(format!(
                "Cannot {}, device '{id}' does not exist",
                action.verb()
            )));
        }
    };

    let name = device.name().to_string();
    info!("{} '{name}'", action.progressing());

    let result = if action == RemovalAction::ForceRemove {
        bridge
            .coordinator
            .remove_device_from_database(&device.ieee_addr)
            .await
    } else {
        bridge
            .coordinator
            .remove_device_from_network(&device.ieee_addr)
            .await
    };

    if action == RemovalAction::Ban {
        bridge.settings.ban_device(&device.ieee_addr);
    }

    if let Err(e) = result {
        bridge
            .log_to_bus(LogEntry::new(
                &format!("device_{}_failed", action.tag()),
                Value::String(id.to_string()),
            ))
            .await?;
        return Ok(CommandOutcome::rejected(format!(
            "Failed to {} {name} ({e}), see \
             https://meshbridge.dev/docs/mqtt-topics#bridge-config-remove for more info",
            action.verb()
        )));
    }

    bridge.notify(BridgeEvent::DeviceRemoved {
        ieee_addr: device.ieee_addr.clone(),
        friendly_name: name.clone(),
        externally_requested: false,
    });
    bridge.settings.remove_device(&device.ieee_addr);
    bridge.state.remove(&device.ieee_addr);

    info!("Successfully {} {name}", action.tag());
    bridge
        .log_to_bus(LogEntry::new(
            &format!("device_{}", action.tag()),
            Value::String(id.to_string()),
        ))
        .await?;
    Ok(CommandOutcome::Completed)
}
