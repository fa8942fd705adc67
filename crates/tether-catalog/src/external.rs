// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugins running as separate processes.
//!
//! The host verifies the binary, starts a host services server on a private
//! socket, spawns the plugin with the magic cookie and waits for its
//! handshake line before dialing the address it advertises.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tether_core::{CloserGroup, ServiceServer, TetherError, Timeouts};
use tether_rpc::dial::{self, Listener};
use tether_rpc::handshake::{
    magic_cookie, HandshakeLine, APP_PROTOCOL_VERSION, HOST_SERVICES_ADDR_ENV, PLUGIN_NAME_ENV,
    PROTOCOL_VERSIONS_ENV,
};
use tether_rpc::layers::Drain;
use tether_rpc::ServerHandle;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::process::{Child, Command};
use tonic::service::RoutesBuilder;
use tracing::{debug, info, warn, Instrument, Span};

use crate::config::PluginConfig;
use crate::plugin::Connection;

/// Time between SIGTERM and SIGKILL when stopping a plugin process.
const KILL_GRACE: Duration = Duration::from_secs(2);

const SHA256_HEX_LEN: usize = 64;

/// Decode a hex SHA-256 checksum.
pub fn parse_checksum(checksum: &str) -> Result<Vec<u8>, TetherError> {
    let bytes = hex::decode(checksum)
        .map_err(|_| TetherError::Config("checksum is not a valid hex string".into()))?;
    if checksum.len() != SHA256_HEX_LEN {
        return Err(TetherError::Config(format!(
            "expected checksum of length {SHA256_HEX_LEN}; got {}",
            checksum.len()
        )));
    }
    Ok(bytes)
}

/// SHA-256 of the file at `path`, hex encoded.
pub async fn file_checksum(path: &Path) -> Result<String, TetherError> {
    let data = tokio::fs::read(path).await?;
    Ok(hex::encode(Sha256::digest(&data)))
}

/// Fail unless the file at `path` hashes to `checksum`.
pub async fn verify_checksum(path: &Path, checksum: &str) -> Result<(), TetherError> {
    let expected = parse_checksum(checksum)?;
    let data = tokio::fs::read(path).await?;
    if Sha256::digest(&data).as_slice() != expected.as_slice() {
        return Err(TetherError::Config(format!(
            "checksum mismatch for {}",
            path.display()
        )));
    }
    Ok(())
}

/// Split `KEY=VALUE` entries.
pub fn parse_env(env: &[String]) -> Result<Vec<(String, String)>, TetherError> {
    env.iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(TetherError::Config(format!(
                "invalid environment variable {entry:?}, expected KEY=VALUE"
            ))),
        })
        .collect()
}

/// Spawn the plugin at `path` and connect to it.
pub(crate) async fn start(
    config: &PluginConfig,
    path: &Path,
    host_services: &[Arc<dyn ServiceServer>],
    timeouts: &Timeouts,
) -> Result<Connection, TetherError> {
    let name = config.name.as_str();
    if let Some(checksum) = &config.checksum {
        verify_checksum(path, checksum).await?;
    }
    let env = parse_env(&config.env)?;

    let (host_address, host_closers) = start_host_services(name, host_services, timeouts)?;

    let mut cmd = Command::new(path);
    let (cookie_key, cookie_value) = magic_cookie(&config.plugin_type);
    cmd.args(&config.args)
        .envs(env)
        .env(cookie_key, cookie_value)
        .env(PROTOCOL_VERSIONS_ENV, APP_PROTOCOL_VERSION.to_string())
        .env(HOST_SERVICES_ADDR_ENV, host_address)
        .env(PLUGIN_NAME_ENV, name)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    tie_to_host_lifetime(&mut cmd);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            close_quietly(host_closers).await;
            return Err(TetherError::Transport {
                plugin: name.to_string(),
                message: format!("failed to start {}", path.display()),
                source: Some(Box::new(e)),
            });
        }
    };

    match connect_child(name, child, timeouts.init).await {
        Ok((channel, process_closer)) => {
            let mut closers = CloserGroup::new();
            closers.push(host_closers);
            closers.push(process_closer);
            Ok(Connection { channel, closers })
        }
        Err(e) => {
            close_quietly(host_closers).await;
            Err(e)
        }
    }
}

fn start_host_services(
    name: &str,
    host_services: &[Arc<dyn ServiceServer>],
    timeouts: &Timeouts,
) -> Result<(String, CloserGroup), TetherError> {
    let Listener {
        address,
        incoming,
        dir,
    } = dial::listen("host.sock")?;

    let mut routes = RoutesBuilder::default();
    for service in host_services {
        service.register(&mut routes);
    }
    let drain = Drain::new();
    let handle = ServerHandle::spawn(name, routes.routes(), incoming, &drain);

    let mut closers = CloserGroup::new();
    closers.push_fn(move || async move {
        drop(dir);
        Ok(())
    });
    closers.push(handle.into_closer(timeouts.graceful_stop));
    Ok((address.to_env(), closers))
}

#[cfg(target_os = "linux")]
fn tie_to_host_lifetime(cmd: &mut Command) {
    use nix::sys::prctl;
    use nix::sys::signal::Signal;

    // SAFETY: prctl is async-signal-safe and touches no memory of the parent.
    unsafe {
        cmd.pre_exec(|| prctl::set_pdeathsig(Signal::SIGKILL).map_err(std::io::Error::from));
    }
}

#[cfg(not(target_os = "linux"))]
fn tie_to_host_lifetime(_cmd: &mut Command) {}

/// Read the handshake line, dial the plugin and wire up its output.
async fn connect_child(
    name: &str,
    mut child: Child,
    init_timeout: Duration,
) -> Result<(tonic::transport::Channel, CloserGroup), TetherError> {
    let transport_err = |message: String| TetherError::Transport {
        plugin: name.to_string(),
        message,
        source: None,
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(transport_err("plugin stdio was not captured".into()));
    };
    let mut stdout = BufReader::new(stdout).lines();
    let stderr = BufReader::new(stderr).lines();
    relay(name, "stderr", stderr);

    let connected = tokio::time::timeout(init_timeout, async {
        let line = stdout
            .next_line()
            .await?
            .ok_or_else(|| transport_err("plugin exited before completing the handshake".into()))?;
        debug!(plugin = %name, handshake = %line.trim(), "received plugin handshake");
        let handshake: HandshakeLine = line.parse().map_err(|e| TetherError::Handshake {
            plugin: name.to_string(),
            message: format!("{e}"),
        })?;
        let channel = dial::connect(&handshake.address)
            .await
            .map_err(|e| TetherError::Transport {
                plugin: name.to_string(),
                message: format!("failed to dial {}", handshake.address.address),
                source: Some(Box::new(e)),
            })?;
        Ok::<_, TetherError>(channel)
    })
    .await
    .unwrap_or_else(|_| {
        Err(TetherError::Timeout {
            operation: format!("handshake with plugin {name}"),
            duration: init_timeout,
        })
    });

    let channel = match connected {
        Ok(channel) => channel,
        Err(e) => {
            stop_process(name, &mut child).await;
            return Err(e);
        }
    };
    relay(name, "stdout", stdout);

    let mut closers = CloserGroup::new();
    let plugin = name.to_string();
    closers.push_fn(move || async move {
        let mut child = child;
        stop_process(&plugin, &mut child).await;
        Ok(())
    });
    Ok((channel, closers))
}

/// Forward a plugin's output into the host log.
fn relay<R>(name: &str, stream: &'static str, mut lines: Lines<BufReader<R>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let span = tracing::info_span!("plugin_output", plugin = %name, stream);
    tokio::spawn(
        async move {
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if !line.trim().is_empty() => info!("{}", line.trim_end()),
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(e) => {
                        debug!(error = %e, "stopped relaying plugin output");
                        break;
                    }
                }
            }
        }
        .instrument(span),
    );
}

/// SIGTERM, then SIGKILL once [`KILL_GRACE`] has passed.
async fn stop_process(name: &str, child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let terminated = child
            .id()
            .is_some_and(|pid| kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok());
        if terminated {
            if let Ok(Ok(status)) = tokio::time::timeout(KILL_GRACE, child.wait()).await {
                debug!(plugin = %name, %status, "plugin process exited");
                return;
            }
            warn!(plugin = %name, "plugin did not exit after SIGTERM, killing it");
        }
    }

    if let Err(e) = child.kill().await {
        debug!(plugin = %name, error = %e, "plugin process already gone");
    }
}

async fn close_quietly(closers: CloserGroup) {
    if let Err(e) = closers.close().await {
        warn!(error = %e, "failed to release resources of a plugin that did not start");
    }
}

/// Log span for an external plugin's transport.
pub(crate) fn transport_span(parent: &Span, path: &Path) -> Span {
    tracing::debug_span!(parent: parent, "external", path = %path.display())
}
