//! Mesh coordinator abstraction: the driver trait, lifecycle events and
//! the device/group model.

mod device;
pub mod sim;

pub use device::{Definition, Device, DeviceType, Entity, GroupHandle};

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Coordinator firmware metadata
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorVersion {
    /// Stack/firmware flavor, e.g. "zStack30x"
    pub stack: String,
    /// Firmware revision string
    pub revision: String,
}

/// Mesh network parameters
#[derive(Debug, Clone, Serialize)]
pub struct NetworkParameters {
    pub pan_id: u16,
    pub extended_pan_id: String,
    pub channel: u8,
}

/// Interview progress reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewStatus {
    Started,
    Successful,
    Failed,
}

/// Lifecycle events emitted by the coordinator driver
#[derive(Debug, Clone)]
pub enum MeshEvent {
    DeviceJoined { device: Device },
    DeviceInterview { device: Device, status: InterviewStatus },
    DeviceAnnounce { device: Device },
    /// Leave carries only the address; the device record may already be gone
    DeviceLeave { ieee_addr: String },
}

/// Driver seam for the wireless transceiver.
///
/// The real radio driver lives outside this crate; [`sim::SimCoordinator`]
/// implements the same surface for development and tests.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Toggle whether new devices may join the network
    async fn permit_join(&self, enable: bool) -> Result<()>;

    /// Current join-permission state
    fn permit_join_enabled(&self) -> bool;

    /// Soft-reset the coordinator radio
    async fn soft_reset(&self) -> Result<()>;

    async fn version(&self) -> Result<CoordinatorVersion>;

    async fn network_parameters(&self) -> Result<NetworkParameters>;

    /// All devices in the live registry, coordinator included
    fn devices(&self) -> Vec<Device>;

    /// Resolve a friendly name, ieee address or numeric group id
    fn resolve_entity(&self, id: &str) -> Option<Entity>;

    async fn create_group(&self, id: u16) -> Result<()>;

    /// Remove a group from the network. Coordinated removal also deletes
    /// the coordinator's database entry.
    async fn remove_group_from_network(&self, id: u16) -> Result<()>;

    /// Remove a group from the coordinator database only
    async fn remove_group_from_database(&self, id: u16) -> Result<()>;

    /// Remove a device from the network (coordinated removal)
    async fn remove_device_from_network(&self, ieee_addr: &str) -> Result<()>;

    /// Remove a device from the coordinator database only
    async fn remove_device_from_database(&self, ieee_addr: &str) -> Result<()>;

    /// Factory-reset the first device answering a touchlink scan,
    /// returning whether one was reset
    async fn touchlink_factory_reset_first(&self) -> Result<bool>;
}
