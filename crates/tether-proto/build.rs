// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generates tonic client/server stubs for the hand-written prost messages.
//!
//! The manual builder needs no `protoc`, so the crate builds anywhere cargo does.

use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic::codec::ProstCodec";

fn method(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(input)
        .output_type(output)
        .codec_path(CODEC)
        .build()
}

fn main() {
    let bootstrap = Service::builder()
        .name("Bootstrap")
        .package("tether.bootstrap.v1")
        .method(method(
            "init",
            "Init",
            "crate::bootstrap::v1::InitRequest",
            "crate::bootstrap::v1::InitResponse",
        ))
        .method(method(
            "deinit",
            "Deinit",
            "crate::bootstrap::v1::DeinitRequest",
            "crate::bootstrap::v1::DeinitResponse",
        ))
        .build();

    let config = Service::builder()
        .name("Config")
        .package("tether.config.v1")
        .method(method(
            "configure",
            "Configure",
            "crate::config::v1::ConfigureRequest",
            "crate::config::v1::ConfigureResponse",
        ))
        .build();

    let test = Service::builder()
        .name("TestService")
        .package("tether.test.v1")
        .method(method(
            "test",
            "Test",
            "crate::test::v1::TestRequest",
            "crate::test::v1::TestResponse",
        ))
        .build();

    let notification = Service::builder()
        .name("NotificationService")
        .package("tether.notification.v1")
        .method(method(
            "send_notification",
            "SendNotification",
            "crate::notification::v1::SendNotificationRequest",
            "crate::notification::v1::SendNotificationResponse",
        ))
        .build();

    let key_management = Service::builder()
        .name("KeyManagementService")
        .package("tether.keymanagement.v1")
        .method(method(
            "create_key",
            "CreateKey",
            "crate::keymanagement::v1::CreateKeyRequest",
            "crate::keymanagement::v1::CreateKeyResponse",
        ))
        .method(method(
            "get_key",
            "GetKey",
            "crate::keymanagement::v1::GetKeyRequest",
            "crate::keymanagement::v1::GetKeyResponse",
        ))
        .build();

    Builder::new().compile(&[bootstrap, config, test, notification, key_management]);

    println!("cargo:rerun-if-changed=build.rs");
}
