//! Retained bridge status snapshot.

use anyhow::Result;
use serde::Serialize;

use crate::mesh::{CoordinatorVersion, NetworkParameters};

use super::{log, Bridge};

#[derive(Serialize)]
struct StatusPayload<'a> {
    version: &'a str,
    commit: &'a str,
    coordinator: CoordinatorVersion,
    network: NetworkParameters,
    log_level: &'a str,
    permit_join: bool,
}

/// Build and publish the status snapshot, retained at QoS 0.
///
/// Called on startup and after any command that changes join permission
/// or log verbosity; there is no periodic republish.
pub async fn publish(bridge: &Bridge) -> Result<()> {
    let payload = StatusPayload {
        version: &bridge.build.version,
        commit: &bridge.build.commit,
        coordinator: bridge.coordinator.version().await?,
        network: bridge.coordinator.network_parameters().await?,
        log_level: bridge.log_control.level_str(),
        permit_join: bridge.coordinator.permit_join_enabled(),
    };

    bridge
        .bus
        .publish(log::CONFIG_TOPIC, serde_json::to_string(&payload)?, true)
        .await
}

#[cfg(test)]
mod tests {
    use super::super::handlers::testutil::fixture;
    use serde_json::Value;

    #[tokio::test]
    async fn snapshot_is_retained_and_complete() {
        let fx = fixture();

        super::publish(&fx.bridge).await.unwrap();

        let messages = fx.bus.on_topic("bridge/config");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].retain);

        let payload: Value = serde_json::from_str(&messages[0].payload).unwrap();
        assert_eq!(payload["version"], "0.1.0-test");
        assert_eq!(payload["commit"], "deadbee");
        assert_eq!(payload["log_level"], "info");
        assert_eq!(payload["permit_join"], false);
        assert_eq!(payload["coordinator"]["stack"], "simStack");
        assert_eq!(payload["network"]["channel"], 11);
    }
}
