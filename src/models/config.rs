use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client settings from `cleandeck.yaml`
///
/// Every section and key is optional; anything left out falls back to its default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendSettings,
    pub ui: UiSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub base_url: String,

    /// Per-request deadline; an expired request fails with a timeout and is not retried
    pub request_timeout_ms: u64,

    /// Path of the dry-run endpoint. Older backends serve it as `/api/preview`.
    pub preview_path: String,
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_ms: 3000,
            preview_path: "/api/analyze".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// How often the UI thread drains the event queue
    pub tick_interval_ms: u64,

    /// Delay before a finished operation's status falls back to idle
    pub status_reset_delay_ms: u64,
}

impl UiSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn status_reset_delay(&self) -> Duration {
        Duration::from_millis(self.status_reset_delay_ms)
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            status_reset_delay_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub directory: String,
    pub prefix: String,
    pub debug: bool,
    pub console: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            prefix: "cleandeck".to_string(),
            debug: false,
            console: false,
        }
    }
}
