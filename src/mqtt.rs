//! MQTT bus client: connection, subscription to the legacy config
//! namespace, and the publish seam the bridge talks through.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// MQTT connection configuration
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Prefix for every topic this gateway touches
    pub base_topic: String,
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive: Duration,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            base_topic: "meshbridge".into(),
            broker: "127.0.0.1".into(),
            port: 1883,
            client_id: "meshbridge".into(),
            username: None,
            password: None,
            keep_alive: Duration::from_secs(30),
        }
    }
}

/// A message received from the bus
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub topic: String,
    pub payload: String,
}

/// Publish seam between the bridge and the bus.
///
/// Topics are relative to the configured base topic. Everything goes out
/// at QoS 0 (at-most-once), matching the legacy wire contract.
#[async_trait]
pub trait Bus: Send + Sync {
    async fn publish(&self, topic: &str, payload: String, retain: bool) -> Result<()>;
}

/// rumqttc-backed bus client
pub struct MqttClient {
    client: AsyncClient,
    base_topic: String,
}

impl MqttClient {
    /// Connect, subscribe to the legacy config namespace, and spawn the
    /// event-loop poll task. Incoming publishes are forwarded on the
    /// returned channel.
    pub async fn connect(config: MqttConfig) -> Result<(Self, mpsc::Receiver<IncomingMessage>)> {
        let mut options = MqttOptions::new(&config.client_id, &config.broker, config.port);
        options.set_keep_alive(config.keep_alive);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            options.set_credentials(user, pass);
        }

        let (client, eventloop) = AsyncClient::new(options, 10);

        let config_namespace = format!("{}/bridge/config/#", config.base_topic);
        client
            .subscribe(&config_namespace, QoS::AtMostOnce)
            .await?;
        info!("Subscribed to {config_namespace}");

        let (incoming_tx, incoming_rx) = mpsc::channel(64);
        tokio::spawn(poll_loop(eventloop, incoming_tx));

        Ok((
            Self {
                client,
                base_topic: config.base_topic,
            },
            incoming_rx,
        ))
    }
}

#[async_trait]
impl Bus for MqttClient {
    async fn publish(&self, topic: &str, payload: String, retain: bool) -> Result<()> {
        let full_topic = format!("{}/{}", self.base_topic, topic);
        self.client
            .publish(full_topic, QoS::AtMostOnce, retain, payload)
            .await?;
        Ok(())
    }
}

/// Drive the rumqttc event loop, forwarding publishes to the bridge
async fn poll_loop(mut eventloop: EventLoop, incoming_tx: mpsc::Sender<IncomingMessage>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = IncomingMessage {
                    topic: publish.topic.clone(),
                    payload: String::from_utf8_lossy(&publish.payload).into_owned(),
                };
                if incoming_tx.send(message).await.is_err() {
                    debug!("Bridge dropped the incoming channel, stopping poll loop");
                    return;
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Connected to MQTT broker");
            }
            Ok(_) => {}
            Err(e) => {
                error!("MQTT connection error: {e}");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! Test doubles for the bus seam.

    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Published {
        pub topic: String,
        pub payload: String,
        pub retain: bool,
    }

    /// Bus that records every publish for assertions
    #[derive(Default)]
    pub struct RecordingBus {
        messages: Mutex<Vec<Published>>,
    }

    impl RecordingBus {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn messages(&self) -> Vec<Published> {
            self.messages.lock().clone()
        }

        pub fn on_topic(&self, topic: &str) -> Vec<Published> {
            self.messages
                .lock()
                .iter()
                .filter(|m| m.topic == topic)
                .cloned()
                .collect()
        }

        pub fn clear(&self) {
            self.messages.lock().clear();
        }
    }

    #[async_trait]
    impl Bus for RecordingBus {
        async fn publish(&self, topic: &str, payload: String, retain: bool) -> Result<()> {
            self.messages.lock().push(Published {
                topic: topic.to_string(),
                payload,
                retain,
            });
            Ok(())
        }
    }
}
