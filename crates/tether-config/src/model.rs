// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host configuration as written in `tether.toml`.
//!
//! Every struct rejects unknown keys so typos surface at startup.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_core::Timeouts;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TetherConfig {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    /// Plugins to load, in order.
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// trace, debug, info, warn or error. `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutsConfig {
    #[serde(default = "default_init_secs")]
    pub init_secs: u64,

    #[serde(default = "default_sixty")]
    pub deinit_secs: u64,

    #[serde(default = "default_sixty")]
    pub graceful_stop_secs: u64,

    #[serde(default = "default_sixty")]
    pub drain_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            init_secs: default_init_secs(),
            deinit_secs: default_sixty(),
            graceful_stop_secs: default_sixty(),
            drain_secs: default_sixty(),
        }
    }
}

fn default_init_secs() -> u64 {
    600
}

fn default_sixty() -> u64 {
    60
}

impl From<&TimeoutsConfig> for Timeouts {
    fn from(t: &TimeoutsConfig) -> Self {
        Timeouts {
            init: Duration::from_secs(t.init_secs),
            deinit: Duration::from_secs(t.deinit_secs),
            graceful_stop: Duration::from_secs(t.graceful_stop_secs),
            drain: Duration::from_secs(t.drain_secs),
        }
    }
}

/// One `[[plugins]]` entry.
///
/// Entries with a `path` are spawned as external processes; entries
/// without one name a built-in plugin.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PluginEntry {
    pub name: String,

    /// Plugin type, e.g. `Notification`. Required for external plugins.
    #[serde(rename = "type", default)]
    pub plugin_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub args: Vec<String>,

    /// `KEY=VALUE` pairs added to the plugin's environment.
    #[serde(default)]
    pub env: Vec<String>,

    /// Hex SHA-256 of the plugin binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    /// Inline YAML pushed once at load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaml_configuration: Option<String>,

    /// YAML file re-read on every reconfigure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl PluginEntry {
    pub fn is_external(&self) -> bool {
        self.path.is_some()
    }
}
