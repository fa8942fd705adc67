// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire contracts shared by the Tether host and its plugins.
//!
//! Messages are declared with `prost` derives; client and server stubs are
//! generated at build time. Each package mirrors its fully qualified gRPC
//! name so `<pkg>::v1::*_SERVICE` matches what plugins advertise during
//! bootstrap.

pub mod bootstrap {
    pub mod v1 {
        /// Fully qualified gRPC name of the bootstrap service.
        pub const BOOTSTRAP_SERVICE: &str = "tether.bootstrap.v1.Bootstrap";

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct InitRequest {
            /// Host services the plugin may dial back into.
            #[prost(string, repeated, tag = "1")]
            pub host_service_names: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct InitResponse {
            /// Services implemented by the plugin.
            #[prost(string, repeated, tag = "1")]
            pub plugin_service_names: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
        }

        #[derive(Clone, Copy, PartialEq, ::prost::Message)]
        pub struct DeinitRequest {}

        #[derive(Clone, Copy, PartialEq, ::prost::Message)]
        pub struct DeinitResponse {}

        tonic::include_proto!("tether.bootstrap.v1.Bootstrap");
    }
}

pub mod config {
    pub mod v1 {
        pub const CONFIG_SERVICE: &str = "tether.config.v1.Config";

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ConfigureRequest {
            #[prost(string, tag = "1")]
            pub yaml_configuration: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ConfigureResponse {
            #[prost(string, tag = "1")]
            pub build_info: ::prost::alloc::string::String,
        }

        tonic::include_proto!("tether.config.v1.Config");
    }
}

pub mod test {
    pub mod v1 {
        pub const TEST_SERVICE: &str = "tether.test.v1.TestService";

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct TestRequest {
            #[prost(string, tag = "1")]
            pub request: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct TestResponse {
            #[prost(string, tag = "1")]
            pub response: ::prost::alloc::string::String,
        }

        tonic::include_proto!("tether.test.v1.TestService");
    }
}

pub mod notification {
    pub mod v1 {
        pub const NOTIFICATION_SERVICE: &str = "tether.notification.v1.NotificationService";

        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum NotificationType {
            Unspecified = 0,
            Email = 1,
            Sms = 2,
            Webhook = 3,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct SendNotificationRequest {
            #[prost(enumeration = "NotificationType", tag = "1")]
            pub notification_type: i32,
            #[prost(string, repeated, tag = "2")]
            pub recipients: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
            #[prost(string, tag = "3")]
            pub subject: ::prost::alloc::string::String,
            #[prost(string, tag = "4")]
            pub body: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct SendNotificationResponse {
            #[prost(bool, tag = "1")]
            pub success: bool,
            #[prost(string, tag = "2")]
            pub message: ::prost::alloc::string::String,
        }

        tonic::include_proto!("tether.notification.v1.NotificationService");
    }
}

pub mod keymanagement {
    pub mod v1 {
        pub const KEY_MANAGEMENT_SERVICE: &str = "tether.keymanagement.v1.KeyManagementService";

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct CreateKeyRequest {
            /// Caller-chosen identifier; empty lets the plugin pick one.
            #[prost(string, tag = "1")]
            pub id: ::prost::alloc::string::String,
            #[prost(string, tag = "2")]
            pub algorithm: ::prost::alloc::string::String,
            #[prost(string, tag = "3")]
            pub region: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct CreateKeyResponse {
            #[prost(string, tag = "1")]
            pub key_id: ::prost::alloc::string::String,
            #[prost(string, tag = "2")]
            pub status: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct GetKeyRequest {
            #[prost(string, tag = "1")]
            pub key_id: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct GetKeyResponse {
            #[prost(string, tag = "1")]
            pub key_id: ::prost::alloc::string::String,
            #[prost(string, tag = "2")]
            pub algorithm: ::prost::alloc::string::String,
            #[prost(string, tag = "3")]
            pub status: ::prost::alloc::string::String,
            #[prost(string, tag = "4")]
            pub usage: ::prost::alloc::string::String,
        }

        tonic::include_proto!("tether.keymanagement.v1.KeyManagementService");
    }
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::bootstrap::v1::InitResponse;
    use super::notification::v1::{NotificationType, SendNotificationRequest};

    #[test]
    fn service_names_match_generated_routes() {
        use tonic::server::NamedService;

        assert_eq!(
            <super::bootstrap::v1::bootstrap_server::BootstrapServer<Noop> as NamedService>::NAME,
            super::bootstrap::v1::BOOTSTRAP_SERVICE
        );
    }

    #[test]
    fn init_response_decodes_names_in_order() {
        let encoded = InitResponse {
            plugin_service_names: vec!["a.B".into(), "c.D".into()],
        }
        .encode_to_vec();
        let decoded = InitResponse::decode(encoded.as_slice()).unwrap();
        assert_eq!(decoded.plugin_service_names, vec!["a.B", "c.D"]);
    }

    #[test]
    fn unknown_notification_type_falls_back() {
        let req = SendNotificationRequest {
            notification_type: 42,
            ..Default::default()
        };
        assert!(NotificationType::try_from(req.notification_type).is_err());
        assert_eq!(
            NotificationType::try_from(1).unwrap(),
            NotificationType::Email
        );
    }

    struct Noop;

    #[tonic::async_trait]
    impl super::bootstrap::v1::bootstrap_server::Bootstrap for Noop {
        async fn init(
            &self,
            _request: tonic::Request<super::bootstrap::v1::InitRequest>,
        ) -> Result<tonic::Response<InitResponse>, tonic::Status> {
            Ok(tonic::Response::new(InitResponse::default()))
        }

        async fn deinit(
            &self,
            _request: tonic::Request<super::bootstrap::v1::DeinitRequest>,
        ) -> Result<tonic::Response<super::bootstrap::v1::DeinitResponse>, tonic::Status> {
            Ok(tonic::Response::new(super::bootstrap::v1::DeinitResponse {}))
        }
    }
}
