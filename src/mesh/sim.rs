//! Simulated coordinator for development and tests.
//!
//! Plays the role the real radio driver would: an in-memory device
//! registry, injectable lifecycle events, and togglable failure modes so
//! the failure paths of the command router can be exercised without
//! hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::now_ms;
use crate::settings::{Settings, SettingsEntity};

use super::{
    Coordinator, CoordinatorVersion, Device, DeviceType, Entity, GroupHandle, MeshEvent,
    NetworkParameters,
};

const COORDINATOR_IEEE: &str = "0x00124b0000000000";

/// Build a plain router device for seeding the simulator
pub fn device_fixture(ieee_addr: &str, model_id: &str) -> Device {
    Device {
        ieee_addr: ieee_addr.to_string(),
        network_address: 0x4f33,
        device_type: DeviceType::Router,
        friendly_name: None,
        definition: None,
        model_id: Some(model_id.to_string()),
        manufacturer_id: Some(4476),
        manufacturer_name: Some("SimVendor".to_string()),
        power_source: Some("Mains (single phase)".to_string()),
        hardware_version: Some(1),
        software_build_id: Some("1.0.0".to_string()),
        date_code: Some("20230101".to_string()),
        last_seen: Some(now_ms()),
    }
}

/// In-process stand-in for the wireless transceiver driver
pub struct SimCoordinator {
    settings: Arc<Settings>,
    devices: RwLock<Vec<Device>>,
    created_groups: RwLock<Vec<u16>>,
    permit_join: AtomicBool,
    fail_soft_reset: AtomicBool,
    fail_device_removal: AtomicBool,
    touchlink_result: AtomicBool,
    device_network_removals: RwLock<Vec<String>>,
    device_database_removals: RwLock<Vec<String>>,
    group_network_removals: RwLock<Vec<u16>>,
    group_database_removals: RwLock<Vec<u16>>,
    events_tx: mpsc::Sender<MeshEvent>,
}

impl SimCoordinator {
    pub fn new(settings: Arc<Settings>) -> (Arc<Self>, mpsc::Receiver<MeshEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);

        let coordinator_device = Device {
            ieee_addr: COORDINATOR_IEEE.to_string(),
            network_address: 0,
            device_type: DeviceType::Coordinator,
            friendly_name: None,
            definition: None,
            model_id: None,
            manufacturer_id: None,
            manufacturer_name: None,
            power_source: None,
            hardware_version: None,
            software_build_id: None,
            date_code: None,
            last_seen: None,
        };

        let sim = Arc::new(Self {
            settings,
            devices: RwLock::new(vec![coordinator_device]),
            created_groups: RwLock::new(Vec::new()),
            permit_join: AtomicBool::new(false),
            fail_soft_reset: AtomicBool::new(false),
            fail_device_removal: AtomicBool::new(false),
            touchlink_result: AtomicBool::new(true),
            device_network_removals: RwLock::new(Vec::new()),
            device_database_removals: RwLock::new(Vec::new()),
            group_network_removals: RwLock::new(Vec::new()),
            group_database_removals: RwLock::new(Vec::new()),
            events_tx,
        });

        (sim, events_rx)
    }

    /// Register a device in the live registry
    pub fn add_device(&self, device: Device) {
        self.devices.write().push(device);
    }

    /// Inject a lifecycle event as the radio would
    pub async fn emit(&self, event: MeshEvent) {
        let _ = self.events_tx.send(event).await;
    }

    pub fn set_fail_soft_reset(&self, fail: bool) {
        self.fail_soft_reset.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_device_removal(&self, fail: bool) {
        self.fail_device_removal.store(fail, Ordering::SeqCst);
    }

    pub fn set_touchlink_result(&self, reset: bool) {
        self.touchlink_result.store(reset, Ordering::SeqCst);
    }

    pub fn created_groups(&self) -> Vec<u16> {
        self.created_groups.read().clone()
    }

    pub fn device_network_removals(&self) -> Vec<String> {
        self.device_network_removals.read().clone()
    }

    pub fn device_database_removals(&self) -> Vec<String> {
        self.device_database_removals.read().clone()
    }

    pub fn group_network_removals(&self) -> Vec<u16> {
        self.group_network_removals.read().clone()
    }

    pub fn group_database_removals(&self) -> Vec<u16> {
        self.group_database_removals.read().clone()
    }

    /// Live-registry lookup with the settings friendly name applied
    fn device_by_addr(&self, ieee_addr: &str) -> Option<Device> {
        self.devices
            .read()
            .iter()
            .find(|d| d.ieee_addr == ieee_addr)
            .cloned()
            .map(|d| self.with_friendly_name(d))
    }

    fn with_friendly_name(&self, mut device: Device) -> Device {
        if device.device_type != DeviceType::Coordinator {
            device.friendly_name = self
                .settings
                .device(&device.ieee_addr)
                .and_then(|record| record.friendly_name);
        }
        device
    }

    fn drop_device(&self, ieee_addr: &str) {
        self.devices.write().retain(|d| d.ieee_addr != ieee_addr);
    }
}

#[async_trait]
impl Coordinator for SimCoordinator {
    async fn permit_join(&self, enable: bool) -> Result<()> {
        self.permit_join.store(enable, Ordering::SeqCst);
        Ok(())
    }

    fn permit_join_enabled(&self) -> bool {
        self.permit_join.load(Ordering::SeqCst)
    }

    async fn soft_reset(&self) -> Result<()> {
        if self.fail_soft_reset.load(Ordering::SeqCst) {
            return Err(anyhow!("radio did not acknowledge the reset request"));
        }
        Ok(())
    }

    async fn version(&self) -> Result<CoordinatorVersion> {
        Ok(CoordinatorVersion {
            stack: "simStack".to_string(),
            revision: "20240315".to_string(),
        })
    }

    async fn network_parameters(&self) -> Result<NetworkParameters> {
        Ok(NetworkParameters {
            pan_id: 0x1a62,
            extended_pan_id: "0xdddddddddddddddd".to_string(),
            channel: 11,
        })
    }

    fn devices(&self) -> Vec<Device> {
        self.devices
            .read()
            .iter()
            .cloned()
            .map(|d| self.with_friendly_name(d))
            .collect()
    }

    fn resolve_entity(&self, id: &str) -> Option<Entity> {
        match self.settings.entity(id) {
            Some(SettingsEntity::Group {
                id,
                friendly_name,
                devices,
            }) => Some(Entity::Group(GroupHandle {
                id,
                friendly_name,
                members: devices,
            })),
            Some(SettingsEntity::Device { ieee_addr, .. }) => {
                self.device_by_addr(&ieee_addr).map(Entity::Device)
            }
            None => self.device_by_addr(id).map(Entity::Device),
        }
    }

    async fn create_group(&self, id: u16) -> Result<()> {
        self.created_groups.write().push(id);
        Ok(())
    }

    async fn remove_group_from_network(&self, id: u16) -> Result<()> {
        self.group_network_removals.write().push(id);
        self.created_groups.write().retain(|g| *g != id);
        Ok(())
    }

    async fn remove_group_from_database(&self, id: u16) -> Result<()> {
        self.group_database_removals.write().push(id);
        self.created_groups.write().retain(|g| *g != id);
        Ok(())
    }

    async fn remove_device_from_network(&self, ieee_addr: &str) -> Result<()> {
        if self.fail_device_removal.load(Ordering::SeqCst) {
            return Err(anyhow!("device did not respond to the leave request"));
        }
        self.device_network_removals
            .write()
            .push(ieee_addr.to_string());
        self.drop_device(ieee_addr);
        Ok(())
    }

    async fn remove_device_from_database(&self, ieee_addr: &str) -> Result<()> {
        if self.fail_device_removal.load(Ordering::SeqCst) {
            return Err(anyhow!("coordinator database rejected the removal"));
        }
        self.device_database_removals
            .write()
            .push(ieee_addr.to_string());
        self.drop_device(ieee_addr);
        Ok(())
    }

    async fn touchlink_factory_reset_first(&self) -> Result<bool> {
        Ok(self.touchlink_result.load(Ordering::SeqCst))
    }
}
