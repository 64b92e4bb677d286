//! Settings-facing commands: advanced options, verbosity, per-device
//! options and whitelisting.

use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::{json, Value};
use tracing::info;

use crate::bridge::log::LogEntry;
use crate::bridge::{status, Bridge, CommandOutcome};
use crate::logging::{LogControl, ALLOWED_LEVELS};
use crate::settings::LastSeenFormat;

use super::parse_object;

/// `last_seen`: select the last-seen timestamp format
pub async fn last_seen(bridge: &Bridge, payload: &str) -> Result<CommandOutcome> {
    let Some(format) = LastSeenFormat::parse(payload) else {
        return Ok(CommandOutcome::rejected(format!(
            "{payload} is not an allowed value, possible: {}",
            LastSeenFormat::ALLOWED.join(",")
        )));
    };

    bridge.settings.set_last_seen(format);
    info!("Set last_seen to {payload}");
    Ok(CommandOutcome::Completed)
}

/// `elapsed`: exact "true"/"false" strings, stored as a boolean
pub async fn elapsed(bridge: &Bridge, payload: &str) -> Result<CommandOutcome> {
    let value = match payload {
        "true" => true,
        "false" => false,
        _ => {
            return Ok(CommandOutcome::rejected(format!(
                "{payload} is not an allowed value, possible: true,false"
            )));
        }
    };

    bridge.settings.set_elapsed(value);
    info!("Set elapsed to {payload}");
    Ok(CommandOutcome::Completed)
}

/// `log_level`: switch verbosity at runtime and republish status.
/// An invalid level is rejected without a status republish.
pub async fn log_level(bridge: &Bridge, payload: &str) -> Result<CommandOutcome> {
    let requested = payload.to_lowercase();
    let Some(level) = LogControl::parse(&requested) else {
        return Ok(CommandOutcome::rejected(format!(
            "Could not set log level to '{requested}'. Allowed level: '{}'",
            ALLOWED_LEVELS.join(",")
        )));
    };

    info!("Switching log level to '{requested}'");
    bridge.log_control.set_level(level)?;
    status::publish(bridge).await?;
    Ok(CommandOutcome::Completed)
}

/// `device_options`: merge a JSON options object into an entity's
/// settings record
pub async fn device_options(bridge: &Bridge, payload: &str) -> Result<CommandOutcome> {
    let Some(message) = parse_object(payload) else {
        return Ok(CommandOutcome::rejected("Failed to parse message as JSON"));
    };

    let (Some(Value::String(name)), Some(Value::Object(options))) =
        (message.get("friendly_name"), message.get("options"))
    else {
        return Ok(CommandOutcome::rejected(
            r#"Invalid JSON message, should contain "friendly_name" and "options""#,
        ));
    };

    let Some(entity) = bridge.settings.entity(name) else {
        return Ok(CommandOutcome::rejected(format!(
            "Entity '{name}' does not exist"
        )));
    };

    let options: BTreeMap<String, Value> = options
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    bridge.settings.merge_entity_options(&entity, &options);

    info!(
        "Changed device specific options of '{name}' ({})",
        serde_json::to_string(&options)?
    );
    Ok(CommandOutcome::Completed)
}

/// `whitelist`: mark an entity as whitelisted. A missing entity is a
/// soft failure.
pub async fn whitelist(bridge: &Bridge, payload: &str) -> Result<CommandOutcome> {
    let Some(entity) = bridge.settings.entity(payload) else {
        return Ok(CommandOutcome::rejected(format!(
            "Failed to whitelist '{payload}', entity does not exist"
        )));
    };

    bridge.settings.whitelist(&entity.id_string());
    info!("Whitelisted '{}'", entity.friendly_name());
    bridge
        .log_to_bus(LogEntry::new(
            "device_whitelisted",
            json!({"friendly_name": entity.friendly_name()}),
        ))
        .await?;
    Ok(CommandOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{fixture, fixture_with_device};
    use super::*;

    #[tokio::test]
    async fn last_seen_rejects_invalid_value_without_change() {
        let fx = fixture();

        let outcome = last_seen(&fx.bridge, "iso_8601").await.unwrap();
        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
        assert_eq!(fx.settings.advanced().last_seen, LastSeenFormat::Disable);

        last_seen(&fx.bridge, "epoch").await.unwrap();
        assert_eq!(fx.settings.advanced().last_seen, LastSeenFormat::Epoch);
    }

    #[tokio::test]
    async fn elapsed_requires_exact_boolean_strings() {
        let fx = fixture();

        elapsed(&fx.bridge, "true").await.unwrap();
        assert!(fx.settings.advanced().elapsed);

        elapsed(&fx.bridge, "false").await.unwrap();
        assert!(!fx.settings.advanced().elapsed);

        let outcome = elapsed(&fx.bridge, "True").await.unwrap();
        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
        assert!(!fx.settings.advanced().elapsed);
    }

    #[tokio::test]
    async fn log_level_switches_and_republishes() {
        let fx = fixture();

        log_level(&fx.bridge, "DEBUG").await.unwrap();

        assert_eq!(fx.bridge.log_control.level_str(), "debug");
        let status = fx.bus.on_topic("bridge/config");
        assert_eq!(status.len(), 1);
        let payload: Value = serde_json::from_str(&status[0].payload).unwrap();
        assert_eq!(payload["log_level"], "debug");
    }

    #[tokio::test]
    async fn invalid_log_level_changes_nothing_and_skips_republish() {
        let fx = fixture();

        let outcome = log_level(&fx.bridge, "verbose").await.unwrap();

        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
        assert_eq!(fx.bridge.log_control.level_str(), "info");
        assert!(fx.bus.messages().is_empty());
    }

    #[tokio::test]
    async fn device_options_merges_into_settings() {
        let fx = fixture_with_device("0x01", "bulb");

        let outcome = device_options(
            &fx.bridge,
            r#"{"friendly_name": "bulb", "options": {"retain": true}}"#,
        )
        .await
        .unwrap();

        assert_eq!(outcome, CommandOutcome::Completed);
        let record = fx.settings.device("0x01").unwrap();
        assert_eq!(record.options["retain"], json!(true));
    }

    #[tokio::test]
    async fn device_options_validates_shape_and_entity() {
        let fx = fixture();

        let outcome = device_options(&fx.bridge, "not json").await.unwrap();
        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));

        let outcome = device_options(&fx.bridge, r#"{"friendly_name": "x"}"#)
            .await
            .unwrap();
        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));

        let outcome = device_options(
            &fx.bridge,
            r#"{"friendly_name": "ghost", "options": {}}"#,
        )
        .await
        .unwrap();
        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
    }

    #[tokio::test]
    async fn whitelist_records_entity_and_publishes() {
        let fx = fixture_with_device("0x01", "bulb");

        whitelist(&fx.bridge, "bulb").await.unwrap();

        assert_eq!(fx.settings.whitelisted(), vec!["0x01".to_string()]);
        let logs = fx.bus.on_topic("bridge/log");
        let entry: Value = serde_json::from_str(&logs[0].payload).unwrap();
        assert_eq!(entry["type"], "device_whitelisted");
        assert_eq!(entry["message"]["friendly_name"], "bulb");
    }

    #[tokio::test]
    async fn whitelist_of_unknown_entity_is_soft() {
        let fx = fixture();

        let outcome = whitelist(&fx.bridge, "ghost").await.unwrap();

        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
        assert!(fx.settings.whitelisted().is_empty());
        assert!(fx.bus.messages().is_empty());
    }
}
