//! The legacy command bridge: dispatch, outcome handling, internal
//! events and the run loop.

pub mod command;
pub mod events;
pub mod handlers;
pub mod log;
pub mod status;

use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info};

use crate::logging::LogControl;
use crate::mesh::{Coordinator, MeshEvent};
use crate::mqtt::{Bus, IncomingMessage};
use crate::settings::Settings;
use crate::state::StateStore;

use command::Command;
use handlers::removal::RemovalAction;
use log::LogEntry;

/// Version metadata injected at startup
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: String,
    pub commit: String,
}

/// Internal events other gateway components can subscribe to.
///
/// `externally_requested` distinguishes changes driven by an external API
/// from ones triggered through this legacy surface (always `false` here).
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    DeviceRenamed {
        from: String,
        to: String,
        externally_requested: bool,
    },
    GroupRenamed {
        from: String,
        to: String,
        externally_requested: bool,
    },
    DeviceRemoved {
        ieee_addr: String,
        friendly_name: String,
        externally_requested: bool,
    },
}

/// Declared result of a command handler, consumed uniformly by the
/// dispatcher: rejections are error-logged and the bridge carries on.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Completed,
    Rejected { message: String },
}

impl CommandOutcome {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// The legacy command router
pub struct Bridge {
    pub(crate) settings: Arc<Settings>,
    pub(crate) coordinator: Arc<dyn Coordinator>,
    pub(crate) bus: Arc<dyn Bus>,
    pub(crate) log_control: Arc<LogControl>,
    pub(crate) state: Arc<StateStore>,
    pub(crate) build: BuildInfo,
    pub(crate) base_topic: String,
    /// Name of the most recently joined device. Written only by the
    /// event translator, read only by `rename_last`.
    last_joined: RwLock<Option<String>>,
    events_tx: broadcast::Sender<BridgeEvent>,
}

impl Bridge {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Arc<Settings>,
        coordinator: Arc<dyn Coordinator>,
        bus: Arc<dyn Bus>,
        log_control: Arc<LogControl>,
        state: Arc<StateStore>,
        build: BuildInfo,
        base_topic: String,
    ) -> Arc<Self> {
        let (events_tx, _) = broadcast::channel(16);

        Arc::new(Self {
            settings,
            coordinator,
            bus,
            log_control,
            state,
            build,
            base_topic,
            last_joined: RwLock::new(None),
            events_tx,
        })
    }

    /// Subscribe to internal bridge events
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events_tx.subscribe()
    }

    pub(crate) fn notify(&self, event: BridgeEvent) {
        // No receivers is fine; nothing may be listening.
        let _ = self.events_tx.send(event);
    }

    pub(crate) fn last_joined_name(&self) -> Option<String> {
        self.last_joined.read().clone()
    }

    pub(crate) fn record_joined(&self, name: &str) {
        *self.last_joined.write() = Some(name.to_string());
    }

    /// Publish an envelope on the legacy log topic
    pub(crate) async fn log_to_bus(&self, entry: LogEntry) -> Result<()> {
        self.bus
            .publish(log::LOG_TOPIC, serde_json::to_string(&entry)?, false)
            .await
    }

    /// Main loop: translate lifecycle events inline, dispatch each bus
    /// message on its own task so one command never blocks another.
    pub async fn run(
        self: Arc<Self>,
        mut mesh_events: mpsc::Receiver<MeshEvent>,
        mut bus_messages: mpsc::Receiver<IncomingMessage>,
    ) {
        if let Err(e) = status::publish(&self).await {
            error!("Failed to publish bridge status: {e:#}");
        }

        loop {
            tokio::select! {
                Some(event) = mesh_events.recv() => {
                    events::handle_mesh_event(&self, event).await;
                }
                Some(message) = bus_messages.recv() => {
                    let bridge = self.clone();
                    tokio::spawn(async move {
                        bridge.dispatch(&message.topic, &message.payload).await;
                    });
                }
                else => {
                    info!("Event channels closed, stopping bridge");
                    break;
                }
            }
        }
    }

    /// Match a raw bus message against the legacy namespace and run the
    /// command. Non-matching topics and unknown keywords are dropped
    /// silently.
    pub async fn dispatch(&self, topic: &str, payload: &str) {
        let Some(keyword) = command::match_topic(&self.base_topic, topic) else {
            return;
        };
        let Some(cmd) = Command::from_keyword(keyword) else {
            return;
        };

        debug!("Dispatching legacy command '{keyword}'");

        match self.handle(cmd, topic, payload).await {
            Ok(CommandOutcome::Completed) => debug!("Command '{keyword}' completed"),
            Ok(CommandOutcome::Rejected { message }) => error!("{message}"),
            Err(e) => error!("Command '{keyword}' failed: {e:#}"),
        }
    }

    /// Exhaustive dispatch from command to typed handler
    pub(crate) async fn handle(
        &self,
        command: Command,
        topic: &str,
        payload: &str,
    ) -> Result<CommandOutcome> {
        match command {
            Command::PermitJoin => handlers::network::permit_join(self, payload).await,
            Command::Reset => handlers::network::reset(self).await,
            Command::TouchlinkFactoryReset => {
                handlers::network::touchlink_factory_reset(self).await
            }
            Command::LastSeen => handlers::options::last_seen(self, payload).await,
            Command::Elapsed => handlers::options::elapsed(self, payload).await,
            Command::LogLevel => handlers::options::log_level(self, payload).await,
            Command::DeviceOptions => handlers::options::device_options(self, payload).await,
            Command::Whitelist => handlers::options::whitelist(self, payload).await,
            Command::Devices => handlers::query::devices(self, topic).await,
            Command::Groups => handlers::query::groups(self).await,
            Command::Rename => handlers::rename::rename(self, payload).await,
            Command::RenameLast => handlers::rename::rename_last(self, payload).await,
            Command::AddGroup => handlers::groups::add_group(self, payload).await,
            Command::RemoveGroup => handlers::groups::remove_group(self, payload, false).await,
            Command::ForceRemoveGroup => handlers::groups::remove_group(self, payload, true).await,
            Command::Remove => handlers::removal::remove(self, RemovalAction::Remove, payload).await,
            Command::ForceRemove => {
                handlers::removal::remove(self, RemovalAction::ForceRemove, payload).await
            }
            Command::Ban => handlers::removal::remove(self, RemovalAction::Ban, payload).await,
        }
    }
}
