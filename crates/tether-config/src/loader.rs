// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered loading with figment.
//!
//! Later layers win: compiled defaults, `/etc/tether/tether.toml`, the user
//! config directory, `./tether.toml`, then `TETHER_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is not ours to box

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;

use crate::model::TetherConfig;

pub const SYSTEM_CONFIG: &str = "/etc/tether/tether.toml";
pub const LOCAL_CONFIG: &str = "tether.toml";

/// `<config dir>/tether/tether.toml`, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tether").join("tether.toml"))
}

/// Files consulted by [`load_config`], lowest precedence first.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];
    paths.extend(user_config_path());
    paths.push(PathBuf::from(LOCAL_CONFIG));
    paths
}

pub fn build_figment() -> Figment {
    search_paths()
        .into_iter()
        .fold(defaults(), |figment, path| figment.merge(Toml::file(path)))
        .merge(env_provider())
}

pub fn load_config() -> Result<TetherConfig, figment::Error> {
    build_figment().extract()
}

/// Load one explicit file plus environment overrides.
pub fn load_config_from_path(path: &Path) -> Result<TetherConfig, figment::Error> {
    defaults()
        .merge(Toml::file_exact(path))
        .merge(env_provider())
        .extract()
}

/// Load from a TOML string alone, without files or environment.
pub fn load_config_from_str(toml: &str) -> Result<TetherConfig, figment::Error> {
    defaults().merge(Toml::string(toml)).extract()
}

fn defaults() -> Figment {
    Figment::new().merge(Serialized::defaults(TetherConfig::default()))
}

/// `TETHER_LOG_LEVEL` maps to `log.level`, `TETHER_TIMEOUTS_INIT_SECS` to
/// `timeouts.init_secs`. Keys are mapped explicitly since field names
/// contain underscores. Plugins cannot be set from the environment.
fn env_provider() -> Env {
    Env::prefixed("TETHER_")
        .map(|key| {
            // figment keeps the variable's case after stripping the prefix.
            let key = key.as_str().to_ascii_lowercase();
            if let Some((section @ ("log" | "timeouts"), rest)) = key.split_once('_') {
                return format!("{section}.{rest}").into();
            }
            key.into()
        })
        .filter(|key| key.as_str().starts_with("log.") || key.as_str().starts_with("timeouts."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn uppercase_variables_map_onto_sections() {
        // SAFETY: env mutation is serialized with #[serial].
        unsafe {
            std::env::set_var("TETHER_TIMEOUTS_DRAIN_SECS", "9");
            std::env::set_var("TETHER_LOG_JSON", "true");
            std::env::set_var("TETHER_PLUGINS", "ignored");
        }
        let config: Result<TetherConfig, _> = defaults().merge(env_provider()).extract();
        unsafe {
            std::env::remove_var("TETHER_TIMEOUTS_DRAIN_SECS");
            std::env::remove_var("TETHER_LOG_JSON");
            std::env::remove_var("TETHER_PLUGINS");
        }

        let config = config.unwrap();
        assert_eq!(config.timeouts.drain_secs, 9);
        assert!(config.log.json);
        assert!(config.plugins.is_empty());
    }

    #[test]
    fn local_file_has_highest_file_precedence() {
        let paths = search_paths();
        assert_eq!(paths.first().unwrap(), Path::new(SYSTEM_CONFIG));
        assert_eq!(paths.last().unwrap(), Path::new(LOCAL_CONFIG));
    }
}
