//! Event translator: mesh lifecycle events become legacy log entries.

use anyhow::Result;
use serde_json::json;
use tracing::error;

use crate::mesh::{Device, InterviewStatus, MeshEvent};

use super::{log::LogEntry, Bridge};

/// Translate one lifecycle event into its bus-visible form.
///
/// Publish failures are logged and swallowed; the translator never takes
/// the bridge down.
pub async fn handle_mesh_event(bridge: &Bridge, event: MeshEvent) {
    let result = match event {
        MeshEvent::DeviceJoined { device } => device_joined(bridge, &device).await,
        MeshEvent::DeviceInterview { device, status } => {
            device_interview(bridge, &device, status).await
        }
        MeshEvent::DeviceAnnounce { device } => {
            bridge
                .log_to_bus(LogEntry::with_meta(
                    "device_announced",
                    "announce",
                    json!({"friendly_name": device.name()}),
                ))
                .await
        }
        MeshEvent::DeviceLeave { ieee_addr } => {
            // The settings record may already be gone; key by address only.
            bridge
                .log_to_bus(LogEntry::with_meta(
                    "device_removed",
                    "left_network",
                    json!({"friendly_name": ieee_addr}),
                ))
                .await
        }
    };

    if let Err(e) = result {
        error!("Failed to publish lifecycle log entry: {e:#}");
    }
}

async fn device_joined(bridge: &Bridge, device: &Device) -> Result<()> {
    bridge.record_joined(device.name());
    bridge
        .log_to_bus(LogEntry::new(
            "device_connected",
            json!({"friendly_name": device.name()}),
        ))
        .await
}

async fn device_interview(
    bridge: &Bridge,
    device: &Device,
    status: InterviewStatus,
) -> Result<()> {
    let entry = match status {
        InterviewStatus::Started => LogEntry::with_meta(
            "pairing",
            "interview_started",
            json!({"friendly_name": device.name()}),
        ),
        InterviewStatus::Failed => LogEntry::with_meta(
            "pairing",
            "interview_failed",
            json!({"friendly_name": device.name()}),
        ),
        InterviewStatus::Successful => match &device.definition {
            Some(definition) => LogEntry::with_meta(
                "pairing",
                "interview_successful",
                json!({
                    "friendly_name": device.name(),
                    "model": definition.model,
                    "vendor": definition.vendor,
                    "description": definition.description,
                    "supported": true,
                }),
            ),
            None => LogEntry::with_meta(
                "pairing",
                "interview_successful",
                json!({"friendly_name": device.name(), "supported": false}),
            ),
        },
    };

    bridge.log_to_bus(entry).await
}

#[cfg(test)]
mod tests {
    use super::super::handlers::testutil::{fixture, fixture_with_device};
    use super::*;
    use crate::mesh::sim::device_fixture;
    use crate::mesh::{Coordinator, Definition};
    use serde_json::Value;

    fn parse(payload: &str) -> Value {
        serde_json::from_str(payload).unwrap()
    }

    #[tokio::test]
    async fn joined_records_last_joined_and_publishes() {
        let fx = fixture_with_device("0x01", "bulb");
        let device = fx.sim.resolve_entity("bulb").unwrap();
        let crate::mesh::Entity::Device(device) = device else {
            panic!("expected device");
        };

        handle_mesh_event(&fx.bridge, MeshEvent::DeviceJoined { device }).await;

        assert_eq!(fx.bridge.last_joined_name().as_deref(), Some("bulb"));
        let logs = fx.bus.on_topic("bridge/log");
        assert_eq!(logs.len(), 1);
        let entry = parse(&logs[0].payload);
        assert_eq!(entry["type"], "device_connected");
        assert_eq!(entry["message"]["friendly_name"], "bulb");
    }

    #[tokio::test]
    async fn joined_overwrites_previous_last_joined() {
        let fx = fixture_with_device("0x01", "first");
        fx.settings.add_device("0x02", Some("second"));
        fx.sim.add_device(device_fixture("0x02", "LED100"));

        for name in ["first", "second"] {
            let crate::mesh::Entity::Device(device) = fx.sim.resolve_entity(name).unwrap() else {
                panic!("expected device");
            };
            handle_mesh_event(&fx.bridge, MeshEvent::DeviceJoined { device }).await;
        }

        assert_eq!(fx.bridge.last_joined_name().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn interview_successful_with_definition_reports_support() {
        let fx = fixture();
        let mut device = device_fixture("0x0a", "LED100");
        device.friendly_name = Some("strip".into());
        device.definition = Some(Definition {
            model: "LED100".into(),
            vendor: "SimVendor".into(),
            description: "Light strip".into(),
        });

        handle_mesh_event(
            &fx.bridge,
            MeshEvent::DeviceInterview {
                device,
                status: InterviewStatus::Successful,
            },
        )
        .await;

        let entry = parse(&fx.bus.on_topic("bridge/log")[0].payload);
        assert_eq!(entry["type"], "pairing");
        assert_eq!(entry["message"], "interview_successful");
        assert_eq!(entry["meta"]["supported"], true);
        assert_eq!(entry["meta"]["model"], "LED100");
        assert_eq!(entry["meta"]["vendor"], "SimVendor");
        assert_eq!(entry["meta"]["description"], "Light strip");
    }

    #[tokio::test]
    async fn interview_successful_without_definition_is_unsupported() {
        let fx = fixture();
        let device = device_fixture("0x0a", "UNKNOWN1");

        handle_mesh_event(
            &fx.bridge,
            MeshEvent::DeviceInterview {
                device,
                status: InterviewStatus::Successful,
            },
        )
        .await;

        let entry = parse(&fx.bus.on_topic("bridge/log")[0].payload);
        assert_eq!(entry["meta"]["supported"], false);
        assert!(entry["meta"].get("model").is_none());
    }

    #[tokio::test]
    async fn interview_started_and_failed_are_minimal() {
        let fx = fixture();

        for (status, message) in [
            (InterviewStatus::Started, "interview_started"),
            (InterviewStatus::Failed, "interview_failed"),
        ] {
            fx.bus.clear();
            handle_mesh_event(
                &fx.bridge,
                MeshEvent::DeviceInterview {
                    device: device_fixture("0x0a", "LED100"),
                    status,
                },
            )
            .await;

            let entry = parse(&fx.bus.on_topic("bridge/log")[0].payload);
            assert_eq!(entry["type"], "pairing");
            assert_eq!(entry["message"], message);
            assert_eq!(entry["meta"]["friendly_name"], "0x0a");
        }
    }

    #[tokio::test]
    async fn leave_is_keyed_by_address_only() {
        let fx = fixture();

        handle_mesh_event(
            &fx.bridge,
            MeshEvent::DeviceLeave {
                ieee_addr: "0xdead".into(),
            },
        )
        .await;

        let entry = parse(&fx.bus.on_topic("bridge/log")[0].payload);
        assert_eq!(entry["type"], "device_removed");
        assert_eq!(entry["message"], "left_network");
        assert_eq!(entry["meta"]["friendly_name"], "0xdead");
    }

    #[tokio::test]
    async fn announce_publishes_announced_entry() {
        let fx = fixture_with_device("0x01", "bulb");
        let crate::mesh::Entity::Device(device) = fx.sim.resolve_entity("bulb").unwrap() else {
            panic!("expected device");
        };

        handle_mesh_event(&fx.bridge, MeshEvent::DeviceAnnounce { device }).await;

        let entry = parse(&fx.bus.on_topic("bridge/log")[0].payload);
        assert_eq!(entry["type"], "device_announced");
        assert_eq!(entry["message"], "announce");
        assert_eq!(entry["meta"]["friendly_name"], "bulb");
    }
}
