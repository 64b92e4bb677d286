//! Runtime log-verbosity control.
//!
//! The legacy `log_level` command can retune verbosity while the gateway is
//! running, so the subscriber is installed behind a reloadable `EnvFilter`.

use anyhow::Result;
use parking_lot::RwLock;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Verbosity levels the legacy surface accepts (`trace` was never exposed)
pub const ALLOWED_LEVELS: [&str; 4] = ["error", "warn", "info", "debug"];

/// Handle to the active verbosity level and the reloadable filter behind it
pub struct LogControl {
    level: RwLock<Level>,
    handle: Option<FilterHandle>,
}

impl LogControl {
    pub fn new(level: Level, handle: Option<FilterHandle>) -> Self {
        Self {
            level: RwLock::new(level),
            handle,
        }
    }

    /// A control without a live subscriber, for tests
    pub fn detached(level: Level) -> Self {
        Self::new(level, None)
    }

    pub fn level(&self) -> Level {
        *self.level.read()
    }

    /// Lowercase spelling used in bus payloads
    pub fn level_str(&self) -> &'static str {
        level_str(self.level())
    }

    /// Parse a level from the restricted legacy set, case-insensitively
    pub fn parse(value: &str) -> Option<Level> {
        match value.to_lowercase().as_str() {
            "error" => Some(Level::ERROR),
            "warn" => Some(Level::WARN),
            "info" => Some(Level::INFO),
            "debug" => Some(Level::DEBUG),
            _ => None,
        }
    }

    /// Switch the active verbosity, reloading the filter when one is attached
    pub fn set_level(&self, level: Level) -> Result<()> {
        if let Some(handle) = &self.handle {
            handle.reload(EnvFilter::new(level_str(level)))?;
        }
        *self.level.write() = level;
        Ok(())
    }
}

fn level_str(level: Level) -> &'static str {
    if level == Level::ERROR {
        "error"
    } else if level == Level::WARN {
        "warn"
    } else if level == Level::INFO {
        "info"
    } else if level == Level::DEBUG {
        "debug"
    } else {
        "trace"
    }
}

/// Install the global subscriber and return the runtime control for it
pub fn init() -> LogControl {
    let filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    LogControl::new(Level::INFO, Some(handle))
}
