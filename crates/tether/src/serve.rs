// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tether serve`: load plugins and keep them running until shutdown.

use std::sync::Arc;

use tether_catalog::{reconfigure_on_signal, CatalogConfig, DataSource, FileData, PluginConfig};
use tether_config::{LogConfig, PluginEntry, TetherConfig};
use tether_core::{TetherError, Timeouts};
use tether_plugin::PluginRepository;
use tracing::{error, info, info_span, Span};

use crate::builtin;

pub async fn run_serve(config: TetherConfig) -> Result<(), TetherError> {
    init_tracing(&config.log);
    info!(plugins = config.plugins.len(), "tether starting");

    let builtins = builtin::registry();
    let mut repo = PluginRepository::create(catalog_config(&config), &builtins).await?;
    for plugin in repo.plugin_infos() {
        info!(
            name = plugin.name(),
            plugin_type = plugin.plugin_type(),
            version = plugin.version(),
            tags = ?plugin.tags(),
            build = %plugin.build(),
            "plugin ready"
        );
    }

    let token = tether_rpc::install_signal_handler();
    if let Err(e) = reconfigure_on_signal(token, &mut repo).await {
        error!(error = %e, "reconfigure loop failed");
    }

    info!("shutting down plugins");
    repo.close().await?;
    info!("tether stopped");
    Ok(())
}

fn init_tracing(log: &LogConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tether={0},tether_catalog={0},tether_rpc={0},tether_plugin={0},warn",
            log.level
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Translate the file configuration into catalog inputs.
pub fn catalog_config(config: &TetherConfig) -> CatalogConfig {
    let root = info_span!("tether");
    CatalogConfig {
        plugins: config
            .plugins
            .iter()
            .map(|entry| plugin_config(entry, &root))
            .collect(),
        host_services: builtin::host_services(),
        timeouts: Timeouts::from(&config.timeouts),
    }
}

fn plugin_config(entry: &PluginEntry, parent: &Span) -> PluginConfig {
    PluginConfig {
        name: entry.name.clone(),
        plugin_type: entry.plugin_type.clone(),
        version: entry.version,
        path: entry.path.clone(),
        args: entry.args.clone(),
        env: entry.env.clone(),
        checksum: entry.checksum.clone(),
        yaml_configuration: entry.yaml_configuration.clone(),
        data_source: entry
            .config_file
            .clone()
            .map(|path| Arc::new(FileData(path)) as Arc<dyn DataSource>),
        disabled: entry.disabled,
        tags: entry.tags.clone(),
        span: Some(parent.clone()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn entries_map_onto_plugin_configs() {
        let config = tether_config::load_config_from_str(
            r#"
[timeouts]
drain_secs = 3

[[plugins]]
name = "log"

[[plugins]]
name = "mailer"
type = "Notification"
path = "/opt/mailer"
args = ["-v"]
config_file = "/etc/tether/mailer.yaml"
version = 1
"#,
        )
        .unwrap();

        let catalog = catalog_config(&config);
        assert_eq!(catalog.timeouts.drain, Duration::from_secs(3));
        assert_eq!(catalog.host_services.len(), 1);

        let log = &catalog.plugins[0];
        assert_eq!(log.name, "log");
        assert!(log.path.is_none());
        assert!(log.data_source.is_none());

        let mailer = &catalog.plugins[1];
        assert_eq!(mailer.plugin_type, "Notification");
        assert_eq!(mailer.args, vec!["-v"]);
        assert_eq!(mailer.version, Some(1));
        let source = mailer.data_source.as_ref().unwrap();
        assert!(source.is_dynamic());
        assert!(format!("{source:?}").contains("mailer.yaml"));
    }
}
