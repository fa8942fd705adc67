// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capabilities shipped with Tether.
//!
//! Each capability module holds the host-side facade and repository and the
//! plugin-side adapter for one plugin type. [`PluginRepository`] aggregates
//! them for hosts that want every capability at once.

pub mod keymanagement;
pub mod notification;
pub mod repository;

pub use keymanagement::{
    key_management_plugin, KeyDetails, KeyManagementRepository, KeyManager, KeySpec,
    KEY_MANAGEMENT_PLUGIN_TYPE,
};
pub use notification::{
    notification_plugin, Delivery, Notification, NotificationKind, NotificationRepository,
    Notifier, NOTIFICATION_PLUGIN_TYPE,
};
pub use repository::PluginRepository;
