// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inputs to [`Catalog::load`](crate::Catalog::load).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tether_core::{ServiceServer, TetherError, Timeouts};
use tracing::Span;

/// Where a plugin's YAML configuration comes from.
#[async_trait]
pub trait DataSource: fmt::Debug + Send + Sync {
    async fn load(&self) -> Result<String, TetherError>;

    /// Dynamic sources are re-read on every reconfigure.
    fn is_dynamic(&self) -> bool {
        false
    }
}

/// Configuration fixed at load time.
#[derive(Debug, Clone, Default)]
pub struct FixedData(pub String);

#[async_trait]
impl DataSource for FixedData {
    async fn load(&self) -> Result<String, TetherError> {
        Ok(self.0.clone())
    }
}

/// Configuration read from a file, re-read on reconfigure.
#[derive(Debug, Clone)]
pub struct FileData(pub PathBuf);

#[async_trait]
impl DataSource for FileData {
    async fn load(&self) -> Result<String, TetherError> {
        tokio::fs::read_to_string(&self.0).await.map_err(|e| {
            TetherError::Config(format!(
                "failed to read plugin configuration {}: {e}",
                self.0.display()
            ))
        })
    }

    fn is_dynamic(&self) -> bool {
        true
    }
}

/// One plugin to load.
///
/// A `path` selects the external process transport; without one the plugin
/// is looked up by `name` among the registered built-ins.
#[derive(Debug, Clone, Default)]
pub struct PluginConfig {
    pub name: String,
    pub plugin_type: String,
    /// Facade version to bind; the most preferred version when unset.
    pub version: Option<u32>,
    pub path: Option<PathBuf>,
    pub args: Vec<String>,
    /// Extra environment for the process, as `KEY=VALUE`.
    pub env: Vec<String>,
    /// Hex SHA-256 of the plugin binary.
    pub checksum: Option<String>,
    pub yaml_configuration: Option<String>,
    pub data_source: Option<Arc<dyn DataSource>>,
    pub disabled: bool,
    pub tags: Vec<String>,
    /// Parent span for everything logged on behalf of this plugin.
    pub span: Option<Span>,
}

impl PluginConfig {
    pub fn builtin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn external(
        name: impl Into<String>,
        plugin_type: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            plugin_type: plugin_type.into(),
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// The configured source, falling back to inline YAML.
    pub(crate) fn effective_data_source(&self) -> Option<Arc<dyn DataSource>> {
        match (&self.data_source, &self.yaml_configuration) {
            (Some(source), _) => Some(Arc::clone(source)),
            (None, Some(yaml)) if !yaml.is_empty() => Some(Arc::new(FixedData(yaml.clone()))),
            _ => None,
        }
    }
}

/// Everything the catalog needs to load a set of plugins.
#[derive(Default)]
pub struct CatalogConfig {
    pub plugins: Vec<PluginConfig>,
    /// Services the host exposes back to its plugins.
    pub host_services: Vec<Arc<dyn ServiceServer>>,
    pub timeouts: Timeouts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inline_yaml_becomes_fixed_source() {
        let mut config = PluginConfig::builtin("p");
        assert!(config.effective_data_source().is_none());

        config.yaml_configuration = Some(String::new());
        assert!(config.effective_data_source().is_none());

        config.yaml_configuration = Some("a: 1".into());
        let source = config.effective_data_source().unwrap();
        assert!(!source.is_dynamic());
        assert_eq!(source.load().await.unwrap(), "a: 1");
    }

    #[tokio::test]
    async fn explicit_source_wins_over_inline_yaml() {
        let mut config = PluginConfig::builtin("p");
        config.yaml_configuration = Some("inline".into());
        config.data_source = Some(Arc::new(FixedData("explicit".into())));
        let source = config.effective_data_source().unwrap();
        assert_eq!(source.load().await.unwrap(), "explicit");
    }

    #[tokio::test]
    async fn missing_file_is_a_config_error() {
        let source = FileData("/nonexistent/tether/plugin.yaml".into());
        assert!(source.is_dynamic());
        assert!(matches!(source.load().await, Err(TetherError::Config(_))));
    }
}
