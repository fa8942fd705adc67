// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checks serde cannot express. All problems are reported, not just the first.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::TetherConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &TetherConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.log.level.as_str()) {
        invalid(format!(
            "log.level `{}` is not one of {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
    }

    for (key, secs) in [
        ("init_secs", config.timeouts.init_secs),
        ("deinit_secs", config.timeouts.deinit_secs),
        ("graceful_stop_secs", config.timeouts.graceful_stop_secs),
        ("drain_secs", config.timeouts.drain_secs),
    ] {
        if secs == 0 {
            invalid(format!("timeouts.{key} must be greater than zero"));
        }
    }

    let mut names = HashSet::new();
    for (i, plugin) in config.plugins.iter().enumerate() {
        if plugin.name.trim().is_empty() {
            invalid(format!("plugins[{i}].name must not be empty"));
        } else if !names.insert(plugin.name.as_str()) {
            invalid(format!("duplicate plugin name `{}`", plugin.name));
        }

        let label = if plugin.name.is_empty() {
            format!("plugins[{i}]")
        } else {
            format!("plugin `{}`", plugin.name)
        };

        if plugin.is_external() && plugin.plugin_type.trim().is_empty() {
            invalid(format!("{label} has a path but no type"));
        }
        if !plugin.is_external() {
            if plugin.checksum.is_some() {
                invalid(format!("{label} is built in and cannot have a checksum"));
            }
            if !plugin.args.is_empty() || !plugin.env.is_empty() {
                invalid(format!("{label} is built in and cannot take args or env"));
            }
        }
        if let Some(checksum) = &plugin.checksum {
            if checksum.len() != 64 || !checksum.chars().all(|c| c.is_ascii_hexdigit()) {
                invalid(format!("{label} checksum must be 64 hex characters (SHA-256)"));
            }
        }
        for entry in &plugin.env {
            if !matches!(entry.split_once('='), Some((key, _)) if !key.is_empty()) {
                invalid(format!("{label} env entry `{entry}` is not KEY=VALUE"));
            }
        }
        if plugin.yaml_configuration.is_some() && plugin.config_file.is_some() {
            invalid(format!("{label} sets both yaml_configuration and config_file"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PluginEntry;

    fn external(name: &str) -> PluginEntry {
        PluginEntry {
            name: name.into(),
            plugin_type: "Notification".into(),
            path: Some("/opt/plugins/mailer".into()),
            ..Default::default()
        }
    }

    fn messages(config: &TetherConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&TetherConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_problem() {
        let mut config = TetherConfig::default();
        config.log.level = "loud".into();
        config.timeouts.init_secs = 0;
        let mut bad = external("mailer");
        bad.plugin_type.clear();
        bad.checksum = Some("abc".into());
        bad.yaml_configuration = Some("a: 1".into());
        bad.config_file = Some("/etc/mailer.yaml".into());
        config.plugins = vec![bad, external("mailer"), external("")];

        let messages = messages(&config);
        assert_eq!(
            messages,
            vec![
                "log.level `loud` is not one of trace, debug, info, warn, error",
                "timeouts.init_secs must be greater than zero",
                "plugin `mailer` has a path but no type",
                "plugin `mailer` checksum must be 64 hex characters (SHA-256)",
                "plugin `mailer` sets both yaml_configuration and config_file",
                "duplicate plugin name `mailer`",
                "plugins[2].name must not be empty",
            ]
        );
    }

    #[test]
    fn builtins_reject_process_settings() {
        let mut config = TetherConfig::default();
        config.plugins = vec![PluginEntry {
            name: "log".into(),
            checksum: Some("ab".repeat(32)),
            env: vec!["NOEQUALS".into()],
            ..Default::default()
        }];
        assert_eq!(
            messages(&config),
            vec![
                "plugin `log` is built in and cannot have a checksum",
                "plugin `log` is built in and cannot take args or env",
                "plugin `log` env entry `NOEQUALS` is not KEY=VALUE",
            ]
        );
    }
}
