//! Group lifecycle: creation and removal.

use anyhow::Result;
use serde_json::Value;
use tracing::info;

use crate::bridge::log::LogEntry;
use crate::bridge::{Bridge, CommandOutcome};
use crate::mesh::Entity;

/// `add_group`: the payload is either a bare name or a JSON object with
/// `id` and/or `friendly_name`. An id without a name defaults the name
/// to `group_<id>`.
pub async fn add_group(bridge: &Bridge, payload: &str) -> Result<CommandOutcome> {
    let (name, id) = match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(message)) => {
            // An id that is present but not a valid group id (non-numeric
            // or out of the u16 range) invalidates the whole message.
            let id = match message.get("id") {
                Some(value) => match value.as_u64().and_then(|id| u16::try_from(id).ok()) {
                    Some(id) => Some(id),
                    None => {
                        return Ok(CommandOutcome::rejected(format!(
                            "Invalid add_group message format, got {payload}"
                        )));
                    }
                },
                None => None,
            };
            let name = match message.get("friendly_name") {
                Some(Value::String(name)) => Some(name.clone()),
                _ => id.map(|id| format!("group_{id}")),
            };
            (name, id)
        }
        Ok(_) => (None, None),
        Err(_) => (Some(payload.to_string()), None),
    };

    let Some(name) = name else {
        return Ok(CommandOutcome::rejected(format!(
            "Invalid add_group message format, got {payload}"
        )));
    };

    let id = match bridge.settings.add_group(&name, id) {
        Ok(id) => id,
        Err(e) => return Ok(CommandOutcome::rejected(e.to_string())),
    };
    bridge.coordinator.create_group(id).await?;

    info!("Added group '{name}'");
    bridge
        .log_to_bus(LogEntry::new("group_added", Value::String(name)))
        .await?;
    Ok(CommandOutcome::Completed)
}

/// `remove_group` / `force_remove_group`: force skips the network and
/// removes from the coordinator database only. The settings record is
/// deleted on either path.
pub async fn remove_group(bridge: &Bridge, payload: &str, force: bool) -> Result<CommandOutcome> {
    let name = payload.trim();
    let group = match bridge.coordinator.resolve_entity(name) {
        Some(Entity::Group(group)) => group,
        _ => {
            return Ok(CommandOutcome::rejected(format!(
                "Group '{name}' does not exist"
            )));
        }
    };

    let result = if force {
        bridge.coordinator.remove_group_from_database(group.id).await
    } else {
        bridge.coordinator.remove_group_from_network(group.id).await
    };
    if let Err(e) = result {
        return Ok(CommandOutcome::rejected(format!(
            "Failed to remove group '{name}' ({e})"
        )));
    }

    bridge.settings.remove_group(group.id);
    info!("Removed group '{name}'");
    bridge
        .log_to_bus(LogEntry::new(
            "group_removed",
            Value::String(name.to_string()),
        ))
        .await?;
    Ok(CommandOutcome::Completed)
}
