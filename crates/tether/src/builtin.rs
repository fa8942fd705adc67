// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugins and host services compiled into the `tether` binary.

use std::sync::Arc;

use async_trait::async_trait;
use tether_catalog::{BuiltIn, BuiltInRegistry};
use tether_core::{ServiceServer, TetherError};
use tether_plugin::{notification_plugin, Delivery, Notification, Notifier};
use tether_proto::test::v1::test_service_server::{TestService, TestServiceServer};
use tether_proto::test::v1::{TestRequest, TestResponse};
use tether_rpc::{GrpcService, PluginName};
use tonic::{Request, Response, Status};
use tracing::info;

/// Name of the notifier that only writes to the host log.
pub const LOG_NOTIFIER: &str = "log";

/// Delivers notifications by logging them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, n: Notification) -> Result<Delivery, TetherError> {
        info!(
            kind = %n.kind,
            recipients = ?n.recipients,
            subject = %n.subject,
            "notification"
        );
        Ok(Delivery {
            success: true,
            message: format!("logged for {} recipients", n.recipients.len()),
        })
    }
}

pub fn registry() -> BuiltInRegistry {
    let mut registry = BuiltInRegistry::new();
    registry.register(
        BuiltIn::new(LOG_NOTIFIER, notification_plugin(Arc::new(LogNotifier), None))
            .with_tags(vec!["builtin".into()]),
    );
    registry
}

/// Answers `TestService` calls so plugins can check their host connection.
struct Ping;

#[tonic::async_trait]
impl TestService for Ping {
    async fn test(&self, r: Request<TestRequest>) -> Result<Response<TestResponse>, Status> {
        let caller = r.extensions().get::<PluginName>().map(|n| n.0.clone());
        let request = r.into_inner().request;
        info!(plugin = caller.as_deref().unwrap_or("-"), %request, "host ping");
        Ok(Response::new(TestResponse {
            response: format!("pong: {request}"),
        }))
    }
}

/// Services the host offers to every plugin.
pub fn host_services() -> Vec<Arc<dyn ServiceServer>> {
    vec![Arc::new(GrpcService::new(TestServiceServer::new(Ping)))]
}

#[cfg(test)]
mod tests {
    use tether_plugin::NotificationKind;

    use super::*;

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        let delivery = LogNotifier
            .send(Notification {
                kind: NotificationKind::Webhook,
                recipients: vec!["https://hooks.example.com/a".into()],
                subject: "deploy".into(),
                body: String::new(),
            })
            .await
            .unwrap();
        assert!(delivery.success);
        assert_eq!(delivery.message, "logged for 1 recipients");
    }

    #[test]
    fn registry_has_log_notifier() {
        let registry = registry();
        let log = registry.get(LOG_NOTIFIER).unwrap();
        assert_eq!(log.plugin_type(), "Notification");
        assert_eq!(log.tags(), ["builtin".to_string()]);
    }
}
