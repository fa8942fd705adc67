// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loading a set of plugins into a ready catalog, or into nothing at all.

use std::sync::Arc;

use async_trait::async_trait;
use tether_core::{PluginInfo, ServiceServer, TetherError, Timeouts};
use tracing::{debug, error, info, info_span, Instrument, Span};

use crate::binder::{bind_plugin, BindTarget, Repository};
use crate::builtin::BuiltInRegistry;
use crate::config::{CatalogConfig, PluginConfig};
use crate::configure::{initial_configure, Reconfigurable, Reconfigure};
use crate::external;
use crate::plugin::LoadedPlugin;

/// The loaded plugins of a host, in load order.
#[derive(Default)]
pub struct Catalog {
    plugins: Vec<LoadedPlugin>,
    reconfigurables: Vec<Reconfigurable>,
}

impl Catalog {
    /// Load every enabled plugin in `config` and bind it into `repository`.
    ///
    /// Either all plugins load, bind, configure and satisfy their
    /// repository's constraint, or everything loaded so far is closed, every
    /// repository is cleared and the first error is returned.
    pub async fn load<R: Repository + ?Sized>(
        config: CatalogConfig,
        builtins: &BuiltInRegistry,
        repository: &mut R,
    ) -> Result<Self, TetherError> {
        let mut catalog = Catalog::default();
        match catalog.load_all(config, builtins, repository).await {
            Ok(()) => {
                info!(plugins = catalog.plugins.len(), "plugin catalog loaded");
                Ok(catalog)
            }
            Err(e) => {
                error!(error = %e, "failed to load plugin catalog, rolling back");
                if let Err(close_err) = catalog.close().await {
                    error!(error = %close_err, "errors while rolling back plugin catalog");
                }
                let mut repos = repository.repos();
                for repo in repos.plugins.iter_mut() {
                    repo.clear();
                }
                for repo in repos.services.iter_mut() {
                    repo.clear();
                }
                Err(e)
            }
        }
    }

    async fn load_all<R: Repository + ?Sized>(
        &mut self,
        config: CatalogConfig,
        builtins: &BuiltInRegistry,
        repository: &mut R,
    ) -> Result<(), TetherError> {
        let CatalogConfig {
            plugins,
            host_services,
            timeouts,
        } = config;
        let host_service_names: Vec<String> = host_services
            .iter()
            .map(|s| s.grpc_service_name().to_string())
            .collect();

        let mut repos = repository.repos();
        let mut counts = vec![0usize; repos.plugins.len()];

        for plugin_config in plugins {
            if plugin_config.disabled {
                debug!(plugin = %plugin_config.name, "skipping disabled plugin");
                continue;
            }
            let name = plugin_config.name.clone();

            let (plugin_type, default_tags) =
                resolve_type(&plugin_config, builtins).map_err(|e| e.for_plugin(&name))?;
            let index = repos
                .plugins
                .iter()
                .position(|r| r.serves(&plugin_type))
                .ok_or_else(|| {
                    TetherError::Config(format!("unsupported plugin type {plugin_type:?}"))
                        .for_plugin(&name)
                })?;

            let span = plugin_span(&plugin_config, &plugin_type);
            let tags = if plugin_config.tags.is_empty() {
                default_tags
            } else {
                plugin_config.tags.clone()
            };
            let info = PluginInfo::new(&name, &plugin_type)
                .with_tags(tags)
                .with_version(plugin_config.version.unwrap_or(1));

            let loaded = connect(
                &plugin_config,
                info,
                builtins,
                &host_services,
                &host_service_names,
                &timeouts,
                span.clone(),
            )
            .instrument(span.clone())
            .await
            .map_err(|e| e.for_plugin(&name))?;

            let target = BindTarget {
                info: loaded.info().clone(),
                span: span.clone(),
                channel: loaded.channel().clone(),
            };
            let service_names = loaded.service_names().to_vec();
            // Registered before binding so a failed bind still unloads it.
            self.plugins.push(loaded);

            let configurer = bind_plugin(
                &target,
                &service_names,
                plugin_config.version,
                &mut *repos.plugins[index],
                &mut repos.services,
            )?;

            let reconfigurable =
                initial_configure(configurer, plugin_config.effective_data_source(), &span)
                    .await
                    .map_err(|e| e.for_plugin(&name))?;
            self.reconfigurables.extend(reconfigurable);

            counts[index] += 1;
            info!(parent: &span, services = ?service_names, "plugin loaded");
        }

        for (repo, count) in repos.plugins.iter().zip(&counts) {
            let plugin_type = repo.plugin_types().first().copied().unwrap_or_default();
            repo.constraints()
                .check(*count)
                .map_err(|violation| TetherError::Constraint {
                    plugin_type: plugin_type.to_string(),
                    violation,
                })?;
        }
        Ok(())
    }

    /// Every loaded plugin, in load order.
    pub fn plugins(&self) -> &[LoadedPlugin] {
        &self.plugins
    }

    pub fn plugins_by_type<'a>(
        &'a self,
        plugin_type: &'a str,
    ) -> impl Iterator<Item = &'a LoadedPlugin> + 'a {
        self.plugins
            .iter()
            .filter(move |p| p.info().plugin_type() == plugin_type)
    }

    pub fn plugin<'a>(&'a self, plugin_type: &'a str, name: &str) -> Option<&'a LoadedPlugin> {
        self.plugins_by_type(plugin_type)
            .find(|p| p.info().name() == name)
    }

    pub fn plugin_infos(&self) -> Vec<PluginInfo> {
        self.plugins.iter().map(|p| p.info().clone()).collect()
    }

    /// Push configuration again to plugins with dynamic data sources.
    pub async fn reconfigure(&mut self) {
        for r in &mut self.reconfigurables {
            r.reconfigure().await;
        }
    }

    /// Unload every plugin, last loaded first, and collect all failures.
    pub async fn close(self) -> Result<(), TetherError> {
        let mut errors = Vec::new();
        for plugin in self.plugins.into_iter().rev() {
            let name = plugin.info().name().to_string();
            if let Err(e) = plugin.unload().await {
                errors.push(e.for_plugin(&name));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(TetherError::Close(errors))
        }
    }
}

#[async_trait]
impl Reconfigure for Catalog {
    async fn reconfigure(&mut self) {
        Catalog::reconfigure(self).await;
    }
}

/// Start the plugin's transport and run its bootstrap handshake.
#[allow(clippy::too_many_arguments)]
async fn connect(
    config: &PluginConfig,
    info: PluginInfo,
    builtins: &BuiltInRegistry,
    host_services: &[Arc<dyn ServiceServer>],
    host_service_names: &[String],
    timeouts: &Timeouts,
    span: Span,
) -> Result<LoadedPlugin, TetherError> {
    let connection = match &config.path {
        Some(path) => {
            external::start(config, path, host_services, timeouts)
                .instrument(external::transport_span(&span, path))
                .await?
        }
        None => builtins
            .get(&config.name)
            .ok_or_else(|| {
                TetherError::Config(format!("builtin plugin {:?} not found", config.name))
            })?
            .start(host_services, timeouts),
    };
    LoadedPlugin::bootstrap(
        info,
        connection,
        host_service_names.to_vec(),
        timeouts.init,
        timeouts.deinit,
        span,
    )
    .await
}

/// External plugins name their type; built-ins bring their own type and tags.
fn resolve_type(
    config: &PluginConfig,
    builtins: &BuiltInRegistry,
) -> Result<(String, Vec<String>), TetherError> {
    if config.path.is_some() {
        if config.name.is_empty() || config.plugin_type.is_empty() {
            return Err(TetherError::Config(
                "plugin name and type are required for external plugins".into(),
            ));
        }
        return Ok((config.plugin_type.clone(), Vec::new()));
    }

    let builtin = builtins.get(&config.name).ok_or_else(|| {
        TetherError::Config(format!("builtin plugin {:?} not found", config.name))
    })?;
    if !config.plugin_type.is_empty() && config.plugin_type != builtin.plugin_type() {
        return Err(TetherError::Config(format!(
            "builtin plugin {:?} has type {:?}, not {:?}",
            config.name,
            builtin.plugin_type(),
            config.plugin_type
        )));
    }
    Ok((builtin.plugin_type().to_string(), builtin.tags().to_vec()))
}

fn plugin_span(config: &PluginConfig, plugin_type: &str) -> Span {
    match &config.span {
        Some(parent) => info_span!(
            parent: parent,
            "plugin",
            plugin_name = %config.name,
            plugin_type = %plugin_type
        ),
        None => info_span!("plugin", plugin_name = %config.name, plugin_type = %plugin_type),
    }
}
