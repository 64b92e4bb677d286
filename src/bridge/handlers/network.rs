//! Network-level commands: join permission, coordinator reset, touchlink.

use anyhow::Result;
use serde_json::json;
use tracing::{info, warn};

use crate::bridge::log::LogEntry;
use crate::bridge::{status, Bridge, CommandOutcome};

/// `permit_join`: case-insensitive "true" enables joining, anything else
/// disables it. Republishes the status snapshot either way.
pub async fn permit_join(bridge: &Bridge, payload: &str) -> Result<CommandOutcome> {
    let enable = payload.eq_ignore_ascii_case("true");
    bridge.coordinator.permit_join(enable).await?;
    status::publish(bridge).await?;
    Ok(CommandOutcome::Completed)
}

/// `reset`: soft-reset the coordinator. A driver failure is reported and
/// never fatal.
pub async fn reset(bridge: &Bridge) -> Result<CommandOutcome> {
    match bridge.coordinator.soft_reset().await {
        Ok(()) => {
            info!("Soft reset coordinator");
            Ok(CommandOutcome::Completed)
        }
        Err(e) => Ok(CommandOutcome::rejected(format!("Soft reset failed ({e})"))),
    }
}

/// `touchlink/factory_reset`: reset the first responder, reporting
/// started and then success or failure.
pub async fn touchlink_factory_reset(bridge: &Bridge) -> Result<CommandOutcome> {
    info!("Starting touchlink factory reset...");
    bridge
        .log_to_bus(LogEntry::with_meta(
            "touchlink",
            "reset_started",
            json!({"status": "started"}),
        ))
        .await?;

    if bridge.coordinator.touchlink_factory_reset_first().await? {
        info!("Successfully factory reset device through touchlink");
        bridge
            .log_to_bus(LogEntry::with_meta(
                "touchlink",
                "reset_success",
                json!({"status": "success"}),
            ))
            .await?;
    } else {
        warn!("Failed to factory reset device through touchlink");
        bridge
            .log_to_bus(LogEntry::with_meta(
                "touchlink",
                "reset_failed",
                json!({"status": "failed"}),
            ))
            .await?;
    }

    Ok(CommandOutcome::Completed)
}
