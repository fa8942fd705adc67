// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters from generated tonic servers to [`ServiceServer`] / [`PluginServer`].

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use tether_core::{PluginServer, ServiceBroker, ServiceServer, TetherError};
use tonic::body::BoxBody;
use tonic::server::NamedService;
use tonic::service::RoutesBuilder;
use tower::Service;

/// Lifecycle hooks for a service that needs more than route registration.
#[async_trait]
pub trait ServiceHooks: Send + Sync + 'static {
    fn wants_host_services(&self) -> bool {
        false
    }

    async fn broker_host_services(&self, _broker: &ServiceBroker) -> Result<(), TetherError> {
        Ok(())
    }

    async fn deinit(&self) -> Result<(), TetherError> {
        Ok(())
    }
}

type RegisterFn = Box<dyn Fn(&mut RoutesBuilder) + Send + Sync>;

/// A generated tonic server wrapped as a [`ServiceServer`].
pub struct GrpcService {
    name: &'static str,
    register: RegisterFn,
    hooks: Option<Arc<dyn ServiceHooks>>,
}

impl GrpcService {
    pub fn new<S>(service: S) -> Self
    where
        S: Service<
                http::Request<BoxBody>,
                Response = http::Response<BoxBody>,
                Error = Infallible,
            > + NamedService
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        Self {
            name: S::NAME,
            register: Box::new(move |routes| {
                routes.add_service(service.clone());
            }),
            hooks: None,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ServiceHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Make this service the one that defines the plugin's type.
    pub fn into_plugin(self, plugin_type: impl Into<String>) -> GrpcPlugin {
        GrpcPlugin {
            service: self,
            plugin_type: plugin_type.into(),
        }
    }
}

#[async_trait]
impl ServiceServer for GrpcService {
    fn grpc_service_name(&self) -> &'static str {
        self.name
    }

    fn register(&self, routes: &mut RoutesBuilder) {
        (self.register)(routes);
    }

    fn wants_host_services(&self) -> bool {
        self.hooks.as_ref().is_some_and(|h| h.wants_host_services())
    }

    async fn broker_host_services(&self, broker: &ServiceBroker) -> Result<(), TetherError> {
        match &self.hooks {
            Some(hooks) => hooks.broker_host_services(broker).await,
            None => Ok(()),
        }
    }

    async fn deinit(&self) -> Result<(), TetherError> {
        match &self.hooks {
            Some(hooks) => hooks.deinit().await,
            None => Ok(()),
        }
    }
}

pub struct GrpcPlugin {
    service: GrpcService,
    plugin_type: String,
}

#[async_trait]
impl ServiceServer for GrpcPlugin {
    fn grpc_service_name(&self) -> &'static str {
        self.service.grpc_service_name()
    }

    fn register(&self, routes: &mut RoutesBuilder) {
        self.service.register(routes);
    }

    fn wants_host_services(&self) -> bool {
        self.service.wants_host_services()
    }

    async fn broker_host_services(&self, broker: &ServiceBroker) -> Result<(), TetherError> {
        self.service.broker_host_services(broker).await
    }

    async fn deinit(&self) -> Result<(), TetherError> {
        self.service.deinit().await
    }
}

impl PluginServer for GrpcPlugin {
    fn plugin_type(&self) -> &str {
        &self.plugin_type
    }
}

#[cfg(test)]
mod tests {
    use tether_proto::test::v1::test_service_server::{TestService, TestServiceServer};
    use tether_proto::test::v1::{TestRequest, TestResponse, TEST_SERVICE};
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

    struct Hooked;

    #[async_trait]
    impl ServiceHooks for Hooked {
        fn wants_host_services(&self) -> bool {
            true
        }
    }

    #[test]
    fn plugin_reports_type_and_name() {
        let plugin = GrpcService::new(TestServiceServer::new(Echo)).into_plugin("Test");
        assert_eq!(plugin.plugin_type(), "Test");
        assert_eq!(plugin.grpc_service_name(), TEST_SERVICE);
        assert!(!plugin.wants_host_services());
    }

    #[test]
    fn hooks_drive_host_service_interest() {
        let svc = GrpcService::new(TestServiceServer::new(Echo)).with_hooks(Arc::new(Hooked));
        assert!(svc.wants_host_services());
    }
}
