// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the catalog, the RPC layer and capability crates.
//!
//! The plugin side implements [`ServiceServer`] (and [`PluginServer`] for the
//! one server that defines the plugin's type). The host side describes each
//! capability with a repository whose `Capability` type ties every
//! [`Version`] to the facade it produces, so a version returning the wrong
//! facade does not compile.

use std::sync::Arc;

use async_trait::async_trait;
use tonic::service::RoutesBuilder;
use tonic::transport::Channel;
use tracing::Span;

use crate::error::TetherError;
use crate::types::{Constraints, PluginInfo};

/// A gRPC service registered on a plugin (or host) server.
#[async_trait]
pub trait ServiceServer: Send + Sync + 'static {
    /// Fully qualified gRPC service name, e.g. `tether.test.v1.TestService`.
    fn grpc_service_name(&self) -> &'static str;

    /// Add the service's routes to a server being assembled.
    fn register(&self, routes: &mut RoutesBuilder);

    /// Whether `Init` should hand this server a [`ServiceBroker`].
    fn wants_host_services(&self) -> bool {
        false
    }

    /// Receive access to host services. Called once during `Init`.
    async fn broker_host_services(&self, _broker: &ServiceBroker) -> Result<(), TetherError> {
        Ok(())
    }

    /// Release resources. Called once during `Deinit`.
    async fn deinit(&self) -> Result<(), TetherError> {
        Ok(())
    }
}

/// The service that gives a plugin its type.
pub trait PluginServer: ServiceServer {
    fn plugin_type(&self) -> &str;
}

/// Host services available to a plugin after `Init`.
#[derive(Debug, Clone)]
pub struct ServiceBroker {
    channel: Channel,
    host_service_names: Vec<String>,
}

impl ServiceBroker {
    pub fn new(channel: Channel, host_service_names: Vec<String>) -> Self {
        Self {
            channel,
            host_service_names,
        }
    }

    /// Channel to the host if it advertised `grpc_service_name`.
    pub fn client(&self, grpc_service_name: &str) -> Option<Channel> {
        self.host_service_names
            .iter()
            .any(|n| n == grpc_service_name)
            .then(|| self.channel.clone())
    }

    pub fn host_service_names(&self) -> &[String] {
        &self.host_service_names
    }
}

/// Lazily opens the plugin's channel back to the host.
#[async_trait]
pub trait HostDialer: Send + Sync {
    async fn dial_host(&self) -> Result<Channel, TetherError>;
}

/// Everything a [`Version`] needs to build a facade for one plugin.
#[derive(Debug, Clone)]
pub struct FacadeBinding {
    pub info: PluginInfo,
    pub span: Span,
    pub channel: Channel,
}

/// One wire-compatible revision of a capability.
pub trait Version<C: ?Sized>: Send + Sync {
    fn grpc_service_name(&self) -> &'static str;

    /// Facade version number, matched against a plugin's requested version.
    fn version(&self) -> u32 {
        1
    }

    fn deprecated(&self) -> bool {
        false
    }

    fn new_facade(&self, binding: FacadeBinding) -> Arc<C>;
}

/// A typed slot accumulating bound facades of one capability.
pub trait ServiceRepo: Send {
    type Capability: ?Sized + Send + Sync + 'static;

    /// Supported versions, most preferred first.
    fn versions(&self) -> Vec<Box<dyn Version<Self::Capability>>>;

    fn bind(&mut self, info: &PluginInfo, facade: Arc<Self::Capability>);

    /// Forget everything bound so far.
    fn clear(&mut self);
}

/// A repository that also defines plugin types and their cardinality.
pub trait PluginRepo: ServiceRepo {
    /// Plugin type names served by this repository; the first is canonical.
    fn plugin_types(&self) -> &'static [&'static str];

    fn constraints(&self) -> Constraints;
}

/// Pushes configuration to a plugin.
#[async_trait]
pub trait Configurer: Send + Sync {
    async fn configure(&self, yaml_configuration: &str) -> Result<(), TetherError>;
}
