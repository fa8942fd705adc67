// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tether check`: verify what can be verified without starting plugins.

use std::process::ExitCode;

use tether_config::{PluginEntry, TetherConfig};

use crate::builtin;

pub async fn run_check(config: &TetherConfig) -> ExitCode {
    let mut failures = 0;
    for entry in &config.plugins {
        match check_plugin(entry).await {
            Ok(status) => println!("  ok    {:<20} {status}", entry.name),
            Err(problem) => {
                failures += 1;
                println!("  FAIL  {:<20} {problem}", entry.name);
            }
        }
    }

    if failures == 0 {
        println!("configuration ok: {} plugins", config.plugins.len());
        ExitCode::SUCCESS
    } else {
        println!("{failures} plugin(s) failed verification");
        ExitCode::FAILURE
    }
}

async fn check_plugin(entry: &PluginEntry) -> Result<String, String> {
    if entry.disabled {
        return Ok("disabled".into());
    }

    let Some(path) = &entry.path else {
        let registry = builtin::registry();
        return match registry.get(&entry.name) {
            Some(b) if entry.plugin_type.is_empty() || entry.plugin_type == b.plugin_type() => {
                Ok(format!("builtin {}", b.plugin_type()))
            }
            Some(b) => Err(format!(
                "builtin has type {:?}, not {:?}",
                b.plugin_type(),
                entry.plugin_type
            )),
            None => Err("no such builtin plugin".into()),
        };
    };

    if !path.is_file() {
        return Err(format!("{} is not a file", path.display()));
    }
    match &entry.checksum {
        Some(checksum) => tether_catalog::verify_checksum(path, checksum)
            .await
            .map(|()| format!("{} checksum verified", entry.plugin_type))
            .map_err(|e| e.to_string()),
        None => Ok(format!("{} (no checksum)", entry.plugin_type)),
    }
}
