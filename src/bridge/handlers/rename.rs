//! Renaming devices and groups, including the last-joined shortcut.

use anyhow::Result;
use serde_json::{json, Value};
use tracing::info;

use crate::bridge::log::LogEntry;
use crate::bridge::{Bridge, BridgeEvent, CommandOutcome};

use super::parse_object;

/// `rename`: JSON `{"old": ..., "new": ...}`; any other shape is rejected
/// without touching settings.
pub async fn rename(bridge: &Bridge, payload: &str) -> Result<CommandOutcome> {
    let parsed = parse_object(payload).and_then(|message| {
        match (message.get("old"), message.get("new")) {
            (Some(Value::String(old)), Some(Value::String(new))) => {
                Some((old.clone(), new.clone()))
            }
            _ => None,
        }
    });

    let Some((from, to)) = parsed else {
        return Ok(CommandOutcome::rejected(format!(
            r#"Invalid rename message format expected {{"old": "friendly_name", "new": "new_name"}} got {payload}"#
        )));
    };

    rename_internal(bridge, &from, &to).await
}

/// `rename_last`: rename the device that joined most recently this
/// session.
pub async fn rename_last(bridge: &Bridge, payload: &str) -> Result<CommandOutcome> {
    let Some(from) = bridge.last_joined_name() else {
        return Ok(CommandOutcome::rejected(
            "Cannot rename last joined device, no device has joined during this session",
        ));
    };

    rename_internal(bridge, &from, payload).await
}

/// Shared rename routine. Group-vs-device is decided before the mutation;
/// any failure collapses into one rejection and partial state is not
/// rolled back.
async fn rename_internal(bridge: &Bridge, from: &str, to: &str) -> Result<CommandOutcome> {
    let is_group = bridge.settings.group_by_name(from).is_some();

    let renamed = bridge.settings.rename(from, to).is_ok()
        && bridge.coordinator.resolve_entity(to).is_some();
    if !renamed {
        return Ok(CommandOutcome::rejected(format!(
            "Failed to rename - {from} to {to}"
        )));
    }

    info!("Successfully renamed - {from} to {to}");

    let event = if is_group {
        BridgeEvent::GroupRenamed {
            from: from.to_string(),
            to: to.to_string(),
            externally_requested: false,
        }
    } else {
        BridgeEvent::DeviceRenamed {
            from: from.to_string(),
            to: to.to_string(),
            externally_requested: false,
        }
    };
    bridge.notify(event);

    let kind = if is_group {
        "group_renamed"
    } else {
        "device_renamed"
    };
    bridge
        .log_to_bus(LogEntry::new(kind, json!({"from": from, "to": to})))
        .await?;
    Ok(CommandOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{fixture, fixture_with_device};
    use super::*;
    use crate::mesh::{Coordinator, MeshEvent};

    #[tokio::test]
    async fn rename_updates_settings_and_publishes() {
        let fx = fixture_with_device("0x01", "bulb");
        let mut events = fx.bridge.subscribe();

        let outcome = rename(&fx.bridge, r#"{"old": "bulb", "new": "lamp"}"#)
            .await
            .unwrap();

        assert_eq!(outcome, CommandOutcome::Completed);
        assert_eq!(
            fx.settings.device("0x01").unwrap().friendly_name.as_deref(),
            Some("lamp")
        );
        assert!(fx.sim.resolve_entity("lamp").is_some());
        assert!(fx.sim.resolve_entity("bulb").is_none());

        let entry: Value =
            serde_json::from_str(&fx.bus.on_topic("bridge/log")[0].payload).unwrap();
        assert_eq!(entry["type"], "device_renamed");
        assert_eq!(entry["message"]["from"], "bulb");
        assert_eq!(entry["message"]["to"], "lamp");

        match events.try_recv().unwrap() {
            BridgeEvent::DeviceRenamed {
                from,
                to,
                externally_requested,
            } => {
                assert_eq!(from, "bulb");
                assert_eq!(to, "lamp");
                assert!(!externally_requested);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rename_of_group_publishes_group_entry() {
        let fx = fixture();
        fx.settings.add_group("kitchen", None).unwrap();
        let mut events = fx.bridge.subscribe();

        rename(&fx.bridge, r#"{"old": "kitchen", "new": "dining"}"#)
            .await
            .unwrap();

        let entry: Value =
            serde_json::from_str(&fx.bus.on_topic("bridge/log")[0].payload).unwrap();
        assert_eq!(entry["type"], "group_renamed");
        assert!(matches!(
            events.try_recv().unwrap(),
            BridgeEvent::GroupRenamed { .. }
        ));
    }

    #[tokio::test]
    async fn malformed_rename_payload_mutates_nothing() {
        let fx = fixture_with_device("0x01", "bulb");

        for payload in ["not json", "[1,2]", r#"{"old": "bulb"}"#, r#"{"new": "x"}"#] {
            let outcome = rename(&fx.bridge, payload).await.unwrap();
            assert_eq!(
                outcome,
                CommandOutcome::rejected(format!(
                    r#"Invalid rename message format expected {{"old": "friendly_name", "new": "new_name"}} got {payload}"#
                ))
            );
        }

        assert_eq!(
            fx.settings.device("0x01").unwrap().friendly_name.as_deref(),
            Some("bulb")
        );
        assert!(fx.bus.messages().is_empty());
    }

    #[tokio::test]
    async fn rename_to_taken_name_is_rejected() {
        let fx = fixture_with_device("0x01", "bulb");
        fx.settings.add_device("0x02", Some("lamp"));

        let outcome = rename(&fx.bridge, r#"{"old": "bulb", "new": "lamp"}"#)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CommandOutcome::rejected("Failed to rename - bulb to lamp")
        );
        assert_eq!(
            fx.settings.device("0x01").unwrap().friendly_name.as_deref(),
            Some("bulb")
        );
    }

    #[tokio::test]
    async fn rename_last_requires_a_join_this_session() {
        let fx = fixture_with_device("0x01", "bulb");

        let outcome = rename_last(&fx.bridge, "lamp").await.unwrap();
        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
        assert_eq!(
            fx.settings.device("0x01").unwrap().friendly_name.as_deref(),
            Some("bulb")
        );
    }

    #[tokio::test]
    async fn rename_last_targets_most_recent_join() {
        let fx = fixture_with_device("0x01", "bulb");
        let crate::mesh::Entity::Device(device) = fx.sim.resolve_entity("bulb").unwrap() else {
            panic!("expected device");
        };
        crate::bridge::events::handle_mesh_event(
            &fx.bridge,
            MeshEvent::DeviceJoined { device },
        )
        .await;
        fx.bus.clear();

        let outcome = rename_last(&fx.bridge, "hallway").await.unwrap();

        assert_eq!(outcome, CommandOutcome::Completed);
        assert_eq!(
            fx.settings.device("0x01").unwrap().friendly_name.as_deref(),
            Some("hallway")
        );
        let entry: Value =
            serde_json::from_str(&fx.bus.on_topic("bridge/log")[0].payload).unwrap();
        assert_eq!(entry["type"], "device_renamed");
        assert_eq!(entry["message"]["from"], "bulb");
        assert_eq!(entry["message"]["to"], "hallway");
    }
}
