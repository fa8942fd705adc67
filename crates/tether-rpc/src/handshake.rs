// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process handshake between a host and an external plugin.
//!
//! The host launches the plugin with a magic cookie in its environment. The
//! plugin answers with a single stdout line:
//!
//! ```text
//! CORE|APP|NETWORK|ADDRESS|PROTOCOL
//! 1|1|unix|/tmp/tether-plugin-x/plugin.sock|grpc
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Version of the handshake line format itself.
pub const CORE_PROTOCOL_VERSION: u32 = 1;

/// Version of the bootstrap protocol spoken over the connection.
pub const APP_PROTOCOL_VERSION: u32 = 1;

/// Comma separated list of app protocol versions the host accepts.
pub const PROTOCOL_VERSIONS_ENV: &str = "PLUGIN_PROTOCOL_VERSIONS";

/// Address of the host services server, as `NETWORK:ADDRESS`.
pub const HOST_SERVICES_ADDR_ENV: &str = "TETHER_HOST_SERVICES_ADDR";

/// Name the host gave the plugin in its configuration.
pub const PLUGIN_NAME_ENV: &str = "TETHER_PLUGIN_NAME";

const PROTOCOL_GRPC: &str = "grpc";

/// The environment variable a plugin of `plugin_type` must find set to
/// `plugin_type` before it agrees to serve.
pub fn magic_cookie(plugin_type: &str) -> (&str, &str) {
    (plugin_type, plugin_type)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Unix,
    Tcp,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Unix => f.write_str("unix"),
            Network::Tcp => f.write_str("tcp"),
        }
    }
}

impl FromStr for Network {
    type Err = HandshakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unix" => Ok(Network::Unix),
            "tcp" => Ok(Network::Tcp),
            other => Err(HandshakeError::UnknownNetwork(other.to_string())),
        }
    }
}

/// A network endpoint such as a socket path or `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub network: Network,
    pub address: String,
}

impl Address {
    pub fn new(network: Network, address: impl Into<String>) -> Self {
        Self {
            network,
            address: address.into(),
        }
    }

    /// Encode for [`HOST_SERVICES_ADDR_ENV`].
    pub fn to_env(&self) -> String {
        format!("{}:{}", self.network, self.address)
    }

    pub fn from_env(value: &str) -> Result<Self, HandshakeError> {
        let (network, address) = value
            .split_once(':')
            .ok_or_else(|| HandshakeError::Malformed(value.to_string()))?;
        Ok(Self::new(network.parse()?, address))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("malformed handshake line {0:?}")]
    Malformed(String),
    #[error("incompatible core protocol version {0}, expected {expected}", expected = CORE_PROTOCOL_VERSION)]
    CoreVersion(u32),
    #[error("incompatible app protocol version {0}, expected {expected}", expected = APP_PROTOCOL_VERSION)]
    AppVersion(u32),
    #[error("unknown network {0:?}")]
    UnknownNetwork(String),
    #[error("unsupported protocol {0:?}, expected grpc")]
    Protocol(String),
}

/// The line a plugin prints once it is ready for connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeLine {
    pub core_version: u32,
    pub app_version: u32,
    pub address: Address,
}

impl HandshakeLine {
    pub fn new(address: Address) -> Self {
        Self {
            core_version: CORE_PROTOCOL_VERSION,
            app_version: APP_PROTOCOL_VERSION,
            address,
        }
    }
}

impl fmt::Display for HandshakeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{PROTOCOL_GRPC}",
            self.core_version, self.app_version, self.address.network, self.address.address
        )
    }
}

impl FromStr for HandshakeLine {
    type Err = HandshakeError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let malformed = || HandshakeError::Malformed(line.to_string());
        // Addresses may contain '|' on exotic platforms, so split from both ends.
        let mut head = line.splitn(3, '|');
        let core = head.next().ok_or_else(malformed)?;
        let app = head.next().ok_or_else(malformed)?;
        let rest = head.next().ok_or_else(malformed)?;
        let (rest, protocol) = rest.rsplit_once('|').ok_or_else(malformed)?;
        let (network, address) = rest.split_once('|').ok_or_else(malformed)?;

        let core_version: u32 = core.parse().map_err(|_| malformed())?;
        if core_version != CORE_PROTOCOL_VERSION {
            return Err(HandshakeError::CoreVersion(core_version));
        }
        let app_version: u32 = app.parse().map_err(|_| malformed())?;
        if app_version != APP_PROTOCOL_VERSION {
            return Err(HandshakeError::AppVersion(app_version));
        }
        if protocol != PROTOCOL_GRPC {
            return Err(HandshakeError::Protocol(protocol.to_string()));
        }
        if address.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            core_version,
            app_version,
            address: Address::new(network.parse()?, address),
        })
    }
}
