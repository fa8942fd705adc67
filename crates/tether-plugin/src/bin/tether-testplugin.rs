// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification plugin used by the integration tests.
//!
//! The subject of a notification selects the behaviour:
//! - `host`: echo the body through the host's `TestService`
//! - `config`: reply with the last pushed configuration
//! - `fail`: fail with `FailedPrecondition`
//! - `panic`: panic inside the handler
//!
//! Anything else is delivered successfully.

use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tether_core::{ServiceBroker, ServiceServer, TetherError};
use tether_plugin::{notification_plugin, Delivery, Notification, Notifier};
use tether_proto::config::v1::config_server::{Config, ConfigServer};
use tether_proto::config::v1::{ConfigureRequest, ConfigureResponse};
use tether_proto::test::v1::test_service_client::TestServiceClient;
use tether_proto::test::v1::test_service_server::{TestService, TestServiceServer};
use tether_proto::test::v1::{TestRequest, TestResponse, TEST_SERVICE};
use tether_rpc::{GrpcService, ServiceHooks};
use tonic::transport::Channel;
use tonic::{Request, Response, Status};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct State {
    config: Mutex<String>,
    host: Mutex<Option<Channel>>,
}

struct TestNotifier(Arc<State>);

#[async_trait]
impl Notifier for TestNotifier {
    async fn send(&self, n: Notification) -> Result<Delivery, TetherError> {
        let message = match n.subject.as_str() {
            "host" => {
                let host = self.0.host.lock().ok().and_then(|h| h.as_ref().cloned());
                let channel = host.ok_or_else(|| TetherError::Rpc {
                    rpc: "SendNotification",
                    status: Status::failed_precondition("host test service not brokered"),
                })?;
                let res = TestServiceClient::new(channel)
                    .test(TestRequest { request: n.body })
                    .await
                    .map_err(|status| TetherError::Rpc { rpc: "Test", status })?;
                res.into_inner().response
            }
            "config" => self.0.config.lock().map(|c| c.clone()).unwrap_or_default(),
            "fail" => {
                return Err(TetherError::Rpc {
                    rpc: "SendNotification",
                    status: Status::failed_precondition("delivery refused"),
                });
            }
            "panic" => panic!("asked to panic"),
            subject => format!("{} sent to {} recipients: {subject}", n.kind, n.recipients.len()),
        };
        Ok(Delivery {
            success: true,
            message,
        })
    }
}

struct Hooks(Arc<State>);

#[async_trait]
impl ServiceHooks for Hooks {
    fn wants_host_services(&self) -> bool {
        true
    }

    async fn broker_host_services(&self, broker: &ServiceBroker) -> Result<(), TetherError> {
        if let Some(channel) = broker.client(TEST_SERVICE) {
            info!("host test service brokered");
            if let Ok(mut host) = self.0.host.lock() {
                *host = Some(channel);
            }
        }
        Ok(())
    }

    async fn deinit(&self) -> Result<(), TetherError> {
        info!("test plugin deinit");
        Ok(())
    }
}

struct Configure(Arc<State>);

#[tonic::async_trait]
impl Config for Configure {
    async fn configure(
        &self,
        request: Request<ConfigureRequest>,
    ) -> Result<Response<ConfigureResponse>, Status> {
        let yaml = request.into_inner().yaml_configuration;
        info!(bytes = yaml.len(), "configuration received");
        if let Ok(mut config) = self.0.config.lock() {
            *config = yaml;
        }
        Ok(Response::new(ConfigureResponse {
            build_info: format!("tether-testplugin {}", env!("CARGO_PKG_VERSION")),
        }))
    }
}

/// Advertised but unknown to hosts, to exercise unsupported-service warnings.
struct Echo;

#[tonic::async_trait]
impl TestService for Echo {
    async fn test(&self, r: Request<TestRequest>) -> Result<Response<TestResponse>, Status> {
        Ok(Response::new(TestResponse {
            response: r.into_inner().request,
        }))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the handshake line.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .init();

    let state = Arc::new(State::default());
    let plugin = notification_plugin(
        Arc::new(TestNotifier(Arc::clone(&state))),
        Some(Arc::new(Hooks(Arc::clone(&state)))),
    );
    let services: Vec<Arc<dyn ServiceServer>> = vec![
        Arc::new(GrpcService::new(ConfigServer::new(Configure(Arc::clone(&state))))),
        Arc::new(GrpcService::new(TestServiceServer::new(Echo))),
    ];

    match tether_rpc::serve(plugin, services).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "test plugin failed");
            ExitCode::FAILURE
        }
    }
}
