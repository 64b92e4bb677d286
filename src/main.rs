use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use meshbridge::bridge::{Bridge, BuildInfo};
use meshbridge::logging;
use meshbridge::mesh::sim::SimCoordinator;
use meshbridge::mqtt::{MqttClient, MqttConfig};
use meshbridge::settings::Settings;
use meshbridge::state::StateStore;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn mqtt_config() -> MqttConfig {
    let defaults = MqttConfig::default();
    MqttConfig {
        base_topic: env_or("MESHBRIDGE_BASE_TOPIC", &defaults.base_topic),
        broker: env_or("MESHBRIDGE_MQTT_BROKER", &defaults.broker),
        port: std::env::var("MESHBRIDGE_MQTT_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port),
        client_id: env_or("MESHBRIDGE_CLIENT_ID", &defaults.client_id),
        username: std::env::var("MESHBRIDGE_MQTT_USERNAME").ok(),
        password: std::env::var("MESHBRIDGE_MQTT_PASSWORD").ok(),
        keep_alive: Duration::from_secs(30),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_control = Arc::new(logging::init());

    let build = BuildInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: option_env!("MESHBRIDGE_COMMIT").unwrap_or("unknown").to_string(),
    };
    info!("meshbridge {} ({}) starting", build.version, build.commit);

    let settings_path = env_or("MESHBRIDGE_SETTINGS", "configuration.yaml");
    let settings = Arc::new(Settings::load(&settings_path)?);
    info!("Loaded settings from {settings_path}");

    // No radio driver yet; the simulated coordinator stands in so the
    // legacy surface can be exercised end to end over a real broker.
    let (coordinator, mesh_events) = SimCoordinator::new(settings.clone());
    let state = Arc::new(StateStore::new());

    let config = mqtt_config();
    let base_topic = config.base_topic.clone();
    info!("Connecting to MQTT broker at {}:{}", config.broker, config.port);
    let (client, bus_messages) = MqttClient::connect(config).await?;

    let bridge = Bridge::new(
        settings,
        coordinator,
        Arc::new(client),
        log_control,
        state,
        build,
        base_topic,
    );

    bridge.run(mesh_events, bus_messages).await;
    Ok(())
}
