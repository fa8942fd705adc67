// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin-side entry point for external plugins.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tether_core::{PluginServer, ServiceServer, TetherError};
use tokio::io::AsyncWriteExt;
use tonic::service::RoutesBuilder;
use tracing::{info, warn};

use crate::bootstrap;
use crate::dial::{listen, CachedHostDialer, Listener};
use crate::handshake::{
    magic_cookie, Address, HandshakeLine, APP_PROTOCOL_VERSION, HOST_SERVICES_ADDR_ENV,
    PLUGIN_NAME_ENV, PROTOCOL_VERSIONS_ENV,
};
use crate::layers::Drain;
use crate::server::ServerHandle;
use crate::shutdown::install_signal_handler;

/// The host escalates to SIGKILL shortly after SIGTERM.
const STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Serve `plugin` and `services` until the host stops the process.
///
/// Verifies the magic cookie, listens on a private socket, prints the
/// handshake line on stdout and blocks until SIGTERM or SIGINT.
pub async fn serve<P: PluginServer>(
    plugin: P,
    services: Vec<Arc<dyn ServiceServer>>,
) -> Result<(), TetherError> {
    let plugin_type = plugin.plugin_type().to_string();
    check_launched_by_host(&plugin_type)?;

    let name = env::var(PLUGIN_NAME_ENV).unwrap_or_else(|_| plugin_type.clone());
    let host = env::var(HOST_SERVICES_ADDR_ENV)
        .ok()
        .map(|v| Address::from_env(&v))
        .transpose()
        .map_err(|e| TetherError::Config(format!("{HOST_SERVICES_ADDR_ENV}: {e}")))?;

    let mut servers: Vec<Arc<dyn ServiceServer>> = vec![Arc::new(plugin)];
    servers.extend(services);
    let mut routes = RoutesBuilder::default();
    bootstrap::register(&mut routes, servers, Arc::new(CachedHostDialer::new(host)));

    let Listener {
        address,
        incoming,
        dir,
    } = listen("plugin.sock")?;
    let drain = Drain::new();
    let handle = ServerHandle::spawn(&name, routes.routes(), incoming, &drain);

    let line = HandshakeLine::new(address);
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{line}\n").as_bytes()).await?;
    stdout.flush().await?;
    info!(plugin = %name, plugin_type = %plugin_type, address = %line.address.address, "plugin serving");

    install_signal_handler().cancelled().await;

    if !handle.graceful_stop_with_timeout(STOP_TIMEOUT).await {
        warn!(plugin = %name, "forced plugin server to stop after timeout");
    }
    drain.wait(STOP_TIMEOUT).await;
    drop(dir);
    Ok(())
}

fn check_launched_by_host(plugin_type: &str) -> Result<(), TetherError> {
    let (key, value) = magic_cookie(plugin_type);
    if env::var(key).ok().as_deref() != Some(value) {
        return Err(TetherError::Config(
            "this binary is a tether plugin and must be launched by a tether host".into(),
        ));
    }

    let supported = env::var(PROTOCOL_VERSIONS_ENV).unwrap_or_default();
    let ours = APP_PROTOCOL_VERSION.to_string();
    if !supported.split(',').any(|v| v.trim() == ours) {
        return Err(TetherError::Config(format!(
            "host supports protocol versions {supported:?}, plugin speaks {ours}"
        )));
    }
    Ok(())
}
