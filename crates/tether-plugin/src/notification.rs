// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `Notification` plugin type.
//!
//! Hosts talk to a [`Notifier`] bound from `tether.notification.v1`; plugin
//! authors implement the same trait and hand it to [`notification_plugin`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tether_core::{
    Constraints, Facade, FacadeBinding, PluginInfo, PluginRepo, ServiceRepo, TetherError, Version,
};
use tether_proto::notification::v1::notification_service_client::NotificationServiceClient;
use tether_proto::notification::v1::notification_service_server::{
    NotificationService, NotificationServiceServer,
};
use tether_proto::notification::v1::{
    NotificationType, SendNotificationRequest, SendNotificationResponse, NOTIFICATION_SERVICE,
};
use tether_rpc::{GrpcPlugin, GrpcService, ServiceHooks};
use tonic::transport::Channel;
use tonic::{Request, Response, Status};

/// Plugin type name served by [`NotificationRepository`].
pub const NOTIFICATION_PLUGIN_TYPE: &str = "Notification";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Email,
    Sms,
    Webhook,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Email => write!(f, "email"),
            NotificationKind::Sms => write!(f, "sms"),
            NotificationKind::Webhook => write!(f, "webhook"),
        }
    }
}

impl From<NotificationKind> for NotificationType {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::Email => NotificationType::Email,
            NotificationKind::Sms => NotificationType::Sms,
            NotificationKind::Webhook => NotificationType::Webhook,
        }
    }
}

impl TryFrom<i32> for NotificationKind {
    type Error = Status;

    fn try_from(value: i32) -> Result<Self, Status> {
        match NotificationType::try_from(value) {
            Ok(NotificationType::Email) => Ok(NotificationKind::Email),
            Ok(NotificationType::Sms) => Ok(NotificationKind::Sms),
            Ok(NotificationType::Webhook) => Ok(NotificationKind::Webhook),
            _ => Err(Status::invalid_argument(format!(
                "unsupported notification type {value}"
            ))),
        }
    }
}

/// A message to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl From<Notification> for SendNotificationRequest {
    fn from(n: Notification) -> Self {
        SendNotificationRequest {
            notification_type: NotificationType::from(n.kind) as i32,
            recipients: n.recipients,
            subject: n.subject,
            body: n.body,
        }
    }
}

impl TryFrom<SendNotificationRequest> for Notification {
    type Error = Status;

    fn try_from(req: SendNotificationRequest) -> Result<Self, Status> {
        Ok(Notification {
            kind: NotificationKind::try_from(req.notification_type)?,
            recipients: req.recipients,
            subject: req.subject,
            body: req.body,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub success: bool,
    pub message: String,
}

/// Sends notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<Delivery, TetherError>;
}

/// Host-side facade over `tether.notification.v1.NotificationService`.
pub struct NotifierV1 {
    facade: Facade,
    client: NotificationServiceClient<Channel>,
}

impl NotifierV1 {
    pub fn info(&self) -> &PluginInfo {
        self.facade.info()
    }
}

#[async_trait]
impl Notifier for NotifierV1 {
    async fn send(&self, notification: Notification) -> Result<Delivery, TetherError> {
        let mut client = self.client.clone();
        let res = client
            .send_notification(SendNotificationRequest::from(notification))
            .await
            .map_err(|status| TetherError::Rpc {
                rpc: "SendNotification",
                status: self.facade.wrap_status(status),
            })?
            .into_inner();
        Ok(Delivery {
            success: res.success,
            message: res.message,
        })
    }
}

struct NotificationV1;

impl Version<dyn Notifier> for NotificationV1 {
    fn grpc_service_name(&self) -> &'static str {
        NOTIFICATION_SERVICE
    }

    fn new_facade(&self, binding: FacadeBinding) -> Arc<dyn Notifier> {
        Arc::new(NotifierV1 {
            facade: Facade::new(&binding),
            client: NotificationServiceClient::new(binding.channel),
        })
    }
}

/// Holds the host's single notifier.
#[derive(Default)]
pub struct NotificationRepository {
    bound: Option<(PluginInfo, Arc<dyn Notifier>)>,
}

impl NotificationRepository {
    pub fn notifier(&self) -> Option<Arc<dyn Notifier>> {
        self.bound.as_ref().map(|(_, n)| Arc::clone(n))
    }

    pub fn info(&self) -> Option<&PluginInfo> {
        self.bound.as_ref().map(|(info, _)| info)
    }
}

impl ServiceRepo for NotificationRepository {
    type Capability = dyn Notifier;

    fn versions(&self) -> Vec<Box<dyn Version<dyn Notifier>>> {
        vec![Box::new(NotificationV1)]
    }

    fn bind(&mut self, info: &PluginInfo, facade: Arc<dyn Notifier>) {
        self.bound = Some((info.clone(), facade));
    }

    fn clear(&mut self) {
        self.bound = None;
    }
}

impl PluginRepo for NotificationRepository {
    fn plugin_types(&self) -> &'static [&'static str] {
        &[NOTIFICATION_PLUGIN_TYPE]
    }

    fn constraints(&self) -> Constraints {
        Constraints::ExactlyOne
    }
}

/// Plugin-side adapter from a [`Notifier`] to the generated server.
struct NotificationHandler<N> {
    notifier: Arc<N>,
}

#[tonic::async_trait]
impl<N: Notifier + 'static> NotificationService for NotificationHandler<N> {
    async fn send_notification(
        &self,
        request: Request<SendNotificationRequest>,
    ) -> Result<Response<SendNotificationResponse>, Status> {
        let notification = Notification::try_from(request.into_inner())?;
        let delivery = self
            .notifier
            .send(notification)
            .await
            .map_err(|e| match e.status() {
                Some(status) => status.clone(),
                None => Status::internal(e.to_string()),
            })?;
        Ok(Response::new(SendNotificationResponse {
            success: delivery.success,
            message: delivery.message,
        }))
    }
}

/// Serve `notifier` as a `Notification` plugin.
///
/// `hooks` receives host services and deinit, when given.
pub fn notification_plugin<N: Notifier + 'static>(
    notifier: Arc<N>,
    hooks: Option<Arc<dyn ServiceHooks>>,
) -> GrpcPlugin {
    let service = GrpcService::new(NotificationServiceServer::new(NotificationHandler { notifier }));
    let service = match hooks {
        Some(hooks) => service.with_hooks(hooks),
        None => service,
    };
    service.into_plugin(NOTIFICATION_PLUGIN_TYPE)
}
