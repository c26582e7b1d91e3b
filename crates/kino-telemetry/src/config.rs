//! Telemetry configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default quiet window after a seek completes, in milliseconds
pub const DEFAULT_SEEK_QUIET_WINDOW_MS: u64 = 300;

/// Upper bound accepted for the quiet window
pub const MAX_SEEK_QUIET_WINDOW_MS: u64 = 10_000;

/// Configuration consumed by a telemetry session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Play/buffering re-announcements this close to a completed seek are
    /// dropped
    pub seek_quiet_window_ms: u64,
    /// Emit `renditionchange` events
    pub rendition_tracking: bool,
    /// Wire in the ad-break coordinator
    pub ad_tracking: bool,
    /// The player was already playing when the session attached; bootstrap
    /// events are synthesized from the player facts
    pub already_playing: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            seek_quiet_window_ms: DEFAULT_SEEK_QUIET_WINDOW_MS,
            rendition_tracking: true,
            ad_tracking: true,
            already_playing: false,
        }
    }
}

impl TelemetryConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.seek_quiet_window_ms > MAX_SEEK_QUIET_WINDOW_MS {
            return Err(Error::InvalidConfig(format!(
                "seek_quiet_window_ms must be at most {MAX_SEEK_QUIET_WINDOW_MS}, got {}",
                self.seek_quiet_window_ms
            )));
        }
        Ok(())
    }

    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.seek_quiet_window_ms)
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
