// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Tether host.
//!
//! TOML files layered with figment, strict key checking, semantic validation
//! and miette diagnostics with typo suggestions.
//!
//! ```no_run
//! match tether_config::load_and_validate() {
//!     Ok(config) => println!("{} plugins configured", config.plugins.len()),
//!     Err(errors) => tether_config::render_errors(&errors),
//! }
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{LogConfig, PluginEntry, TetherConfig, TimeoutsConfig};

/// Load from the standard locations and validate.
pub fn load_and_validate() -> Result<TetherConfig, Vec<ConfigError>> {
    let paths = loader::search_paths();
    tracing::debug!(?paths, "loading configuration");
    finish(loader::load_config(), read_sources(&paths))
}

pub fn load_and_validate_path(path: &Path) -> Result<TetherConfig, Vec<ConfigError>> {
    tracing::debug!(path = %path.display(), "loading configuration");
    finish(
        loader::load_config_from_path(path),
        read_sources(&[path.to_path_buf()]),
    )
}

pub fn load_and_validate_str(toml: &str) -> Result<TetherConfig, Vec<ConfigError>> {
    finish(
        loader::load_config_from_str(toml),
        vec![("<inline>".to_string(), toml.to_string())],
    )
}

fn finish(
    loaded: Result<TetherConfig, figment::Error>,
    sources: Vec<(String, String)>,
) -> Result<TetherConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|e| diagnostic::from_figment(e, &sources))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Contents of the files that exist, keyed the way figment reports them.
fn read_sources(paths: &[std::path::PathBuf]) -> Vec<(String, String)> {
    paths
        .iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(path).ok()?;
            let absolute = if path.is_absolute() {
                path.clone()
            } else {
                std::env::current_dir().ok()?.join(path)
            };
            Some((absolute.display().to_string(), content))
        })
        .collect()
}
