// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process plugins served over the pipe network.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tether_core::{CloserGroup, HostDialer, PluginServer, ServiceServer, TetherError, Timeouts};
use tether_rpc::{bootstrap, start_pipe_server};
use tokio::sync::Mutex;
use tonic::service::RoutesBuilder;
use tonic::transport::Channel;

use crate::plugin::Connection;

/// A plugin compiled into the host.
#[derive(Clone)]
pub struct BuiltIn {
    name: String,
    plugin_type: String,
    tags: Vec<String>,
    servers: Vec<Arc<dyn ServiceServer>>,
}

impl BuiltIn {
    pub fn new<P: PluginServer>(name: impl Into<String>, plugin: P) -> Self {
        let plugin_type = plugin.plugin_type().to_string();
        Self {
            name: name.into(),
            plugin_type,
            tags: Vec::new(),
            servers: vec![Arc::new(plugin)],
        }
    }

    /// Serve an additional service alongside the plugin's own.
    pub fn with_service(mut self, service: Arc<dyn ServiceServer>) -> Self {
        self.servers.push(service);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plugin_type(&self) -> &str {
        &self.plugin_type
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Start a pipe server for this plugin and connect to it.
    ///
    /// Closing the connection stops the plugin's server first and the host
    /// services server it may have dialed last.
    pub(crate) fn start(
        &self,
        host_services: &[Arc<dyn ServiceServer>],
        timeouts: &Timeouts,
    ) -> Connection {
        let dialer = Arc::new(PipeHostDialer {
            plugin_name: self.name.clone(),
            host_services: host_services.to_vec(),
            timeouts: *timeouts,
            conn: Mutex::new(None),
        });

        let mut routes = RoutesBuilder::default();
        bootstrap::register(
            &mut routes,
            self.servers.clone(),
            Arc::clone(&dialer) as Arc<dyn HostDialer>,
        );
        let (channel, server_closers) = start_pipe_server(&self.name, routes.routes(), timeouts);

        let mut closers = CloserGroup::new();
        closers.push_fn(move || async move { dialer.close().await });
        closers.push(server_closers);
        Connection { channel, closers }
    }
}

impl std::fmt::Debug for BuiltIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltIn")
            .field("name", &self.name)
            .field("plugin_type", &self.plugin_type)
            .field("servers", &self.servers.len())
            .finish()
    }
}

/// Built-in plugins available to a catalog, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct BuiltInRegistry {
    plugins: BTreeMap<String, BuiltIn>,
}

impl BuiltInRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a built-in, replacing any previous one with the same name.
    pub fn register(&mut self, builtin: BuiltIn) -> &mut Self {
        self.plugins.insert(builtin.name.clone(), builtin);
        self
    }

    pub fn get(&self, name: &str) -> Option<&BuiltIn> {
        self.plugins.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }
}

/// Serves host services to one built-in plugin over its own pipe.
///
/// The server is started by the first dial and shared after that.
struct PipeHostDialer {
    plugin_name: String,
    host_services: Vec<Arc<dyn ServiceServer>>,
    timeouts: Timeouts,
    conn: Mutex<Option<(Channel, CloserGroup)>>,
}

impl PipeHostDialer {
    async fn close(&self) -> Result<(), TetherError> {
        match self.conn.lock().await.take() {
            Some((_, closers)) => closers.close().await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl HostDialer for PipeHostDialer {
    async fn dial_host(&self) -> Result<Channel, TetherError> {
        let mut conn = self.conn.lock().await;
        if let Some((channel, _)) = conn.as_ref() {
            return Ok(channel.clone());
        }
        let mut routes = RoutesBuilder::default();
        for service in &self.host_services {
            service.register(&mut routes);
        }
        let (channel, closers) =
            start_pipe_server(&self.plugin_name, routes.routes(), &self.timeouts);
        *conn = Some((channel.clone(), closers));
        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use tether_proto::test::v1::test_service_server::{TestService, TestServiceServer};
    use tether_proto::test::v1::{TestRequest, TestResponse};
    use tether_rpc::GrpcService;
    use tonic::{Request, Response, Status};

    use super::*;

    struct Echo;

    #[tonic::async_trait]
    impl TestService for Echo {
        async fn test(&self, r: Request<TestRequest>) -> Result<Response<TestResponse>, Status> {
            Ok(Response::new(TestResponse {
                response: r.into_inner().request,
            }))
        }
    }

    fn echo(name: &str) -> BuiltIn {
        BuiltIn::new(name, GrpcService::new(TestServiceServer::new(Echo)).into_plugin("Test"))
    }

    #[test]
    fn registry_looks_up_by_name() {
        let mut registry = BuiltInRegistry::new();
        registry.register(echo("b")).register(echo("a"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().plugin_type(), "Test");
        assert!(registry.get("c").is_none());
    }

    #[tokio::test]
    async fn host_dial_is_memoized() {
        let dialer = PipeHostDialer {
            plugin_name: "p".into(),
            host_services: vec![Arc::new(GrpcService::new(TestServiceServer::new(Echo)))],
            timeouts: Timeouts::default(),
            conn: Mutex::new(None),
        };
        dialer.dial_host().await.unwrap();
        dialer.dial_host().await.unwrap();
        assert!(dialer.conn.lock().await.is_some());
        dialer.close().await.unwrap();
        assert!(dialer.conn.lock().await.is_none());
    }
}
