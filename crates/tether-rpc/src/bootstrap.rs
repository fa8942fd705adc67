// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `Init`/`Deinit` protocol every plugin speaks.
//!
//! `Init` tells the plugin which host services it may dial back into and
//! returns the services it implements. `Deinit` is the last call a plugin
//! receives before its transport is torn down. Plugins built against older
//! SDKs may not implement either; `Unimplemented` is tolerated on both.

use std::sync::Arc;

use tether_core::{HostDialer, ServiceBroker, ServiceServer, TetherError};
use tether_proto::bootstrap::v1::bootstrap_client::BootstrapClient;
use tether_proto::bootstrap::v1::bootstrap_server::{Bootstrap, BootstrapServer};
use tether_proto::bootstrap::v1::{DeinitRequest, DeinitResponse, InitRequest, InitResponse};
use tonic::service::RoutesBuilder;
use tonic::transport::Channel;
use tonic::{Code, Request, Response, Status};
use tracing::{debug, warn};

/// Exchange service names with a freshly connected plugin.
pub async fn init(
    channel: Channel,
    host_service_names: Vec<String>,
) -> Result<Vec<String>, TetherError> {
    let mut client = BootstrapClient::new(channel);
    match client.init(InitRequest { host_service_names }).await {
        Ok(res) => Ok(res.into_inner().plugin_service_names),
        Err(status) if status.code() == Code::Unimplemented => Ok(Vec::new()),
        Err(status) => Err(TetherError::Rpc { rpc: "Init", status }),
    }
}

/// Tell a plugin it is about to be unloaded.
pub async fn deinit(channel: Channel) -> Result<(), TetherError> {
    let mut client = BootstrapClient::new(channel);
    match client.deinit(DeinitRequest {}).await {
        Ok(_) => Ok(()),
        Err(status) if status.code() == Code::Unimplemented => Ok(()),
        Err(status) => Err(TetherError::Rpc {
            rpc: "Deinit",
            status,
        }),
    }
}

/// Plugin-side implementation of the bootstrap service.
pub struct BootstrapService {
    servers: Vec<Arc<dyn ServiceServer>>,
    dialer: Arc<dyn HostDialer>,
}

impl BootstrapService {
    pub fn new(servers: Vec<Arc<dyn ServiceServer>>, dialer: Arc<dyn HostDialer>) -> Self {
        Self { servers, dialer }
    }
}

#[tonic::async_trait]
impl Bootstrap for BootstrapService {
    async fn init(&self, request: Request<InitRequest>) -> Result<Response<InitResponse>, Status> {
        let host_service_names = request.into_inner().host_service_names;
        debug!(host_services = ?host_service_names, "bootstrap init");

        let mut broker: Option<ServiceBroker> = None;
        for server in self.servers.iter().filter(|s| s.wants_host_services()) {
            let b = match &broker {
                Some(b) => b.clone(),
                None => {
                    let channel = self.dialer.dial_host().await.map_err(|e| {
                        Status::unavailable(format!("failed to dial host services: {e}"))
                    })?;
                    let b = ServiceBroker::new(channel, host_service_names.clone());
                    broker = Some(b.clone());
                    b
                }
            };
            server.broker_host_services(&b).await.map_err(|e| {
                Status::internal(format!(
                    "{}: failed to broker host services: {e}",
                    server.grpc_service_name()
                ))
            })?;
        }

        Ok(Response::new(InitResponse {
            plugin_service_names: self
                .servers
                .iter()
                .map(|s| s.grpc_service_name().to_string())
                .collect(),
        }))
    }

    async fn deinit(
        &self,
        _request: Request<DeinitRequest>,
    ) -> Result<Response<DeinitResponse>, Status> {
        for server in &self.servers {
            if let Err(e) = server.deinit().await {
                warn!(service = server.grpc_service_name(), error = %e, "service deinit failed");
            }
        }
        Ok(Response::new(DeinitResponse {}))
    }
}

/// Register `servers` and the bootstrap service that advertises them.
pub fn register(
    routes: &mut RoutesBuilder,
    servers: Vec<Arc<dyn ServiceServer>>,
    dialer: Arc<dyn HostDialer>,
) {
    for server in &servers {
        server.register(routes);
    }
    routes.add_service(BootstrapServer::new(BootstrapService::new(servers, dialer)));
}
