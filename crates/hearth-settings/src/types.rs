//! Settings type definitions.
//!
//! All types use camelCase on disk. Every section implements [`Default`] and
//! is marked `#[serde(default)]`, so a partial JSON file is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings type.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HearthSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Remote fetch and model settings.
    pub sync: SyncSettings,
    /// Shared channel settings.
    pub transport: TransportSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for HearthSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "hearth".to_string(),
            sync: SyncSettings::default(),
            transport: TransportSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    /// Deadline for a single remote fetch. `None` waits indefinitely for the
    /// matching reply, leaving the model's single-flight guard engaged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_ms: Option<u64>,
    /// Owning scope stamped on envelopes issued by the primary models.
    pub default_context: String,
    /// Subscriber id the model coordinator registers its listeners under.
    pub coordinator_subscriber: String,
}

impl SyncSettings {
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: None,
            default_context: "main-window".to_string(),
            coordinator_subscriber: "model-coordinator".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportSettings {
    /// Bounded queue size for each direction of the in-process channel.
    pub channel_capacity: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level filter (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Per-module overrides, e.g. `{"hearth_sync": "debug"}`.
    pub modules: std::collections::BTreeMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            modules: std::collections::BTreeMap::new(),
        }
    }
}
