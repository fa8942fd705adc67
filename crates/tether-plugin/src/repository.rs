// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Every capability a Tether host consumes, plus the catalog backing them.

use std::sync::Arc;

use async_trait::async_trait;
use tether_catalog::{BuiltInRegistry, Catalog, CatalogConfig, Reconfigure, Repos, Repository};
use tether_core::{PluginInfo, TetherError};

use crate::keymanagement::{KeyManagementRepository, KeyManager};
use crate::notification::{NotificationRepository, Notifier};

#[derive(Default)]
struct Capabilities {
    notification: NotificationRepository,
    key_management: KeyManagementRepository,
}

impl Repository for Capabilities {
    fn repos(&mut self) -> Repos<'_> {
        Repos {
            plugins: vec![&mut self.notification, &mut self.key_management],
            services: vec![],
        }
    }
}

/// Loaded plugins, reachable through their capabilities.
pub struct PluginRepository {
    capabilities: Capabilities,
    catalog: Catalog,
}

impl PluginRepository {
    /// Load the catalog and bind every plugin.
    ///
    /// Exactly one `Notification` plugin must be configured.
    pub async fn create(
        config: CatalogConfig,
        builtins: &BuiltInRegistry,
    ) -> Result<Self, TetherError> {
        let mut capabilities = Capabilities::default();
        let catalog = Catalog::load(config, builtins, &mut capabilities).await?;
        Ok(Self {
            capabilities,
            catalog,
        })
    }

    pub fn notifier(&self) -> Result<Arc<dyn Notifier>, TetherError> {
        self.capabilities
            .notification
            .notifier()
            .ok_or_else(|| TetherError::Internal("no notification plugin is bound".into()))
    }

    pub fn key_manager(&self, name: &str) -> Option<Arc<dyn KeyManager>> {
        self.capabilities.key_management.get(name)
    }

    pub fn key_managers(&self) -> &KeyManagementRepository {
        &self.capabilities.key_management
    }

    pub fn plugin_infos(&self) -> Vec<PluginInfo> {
        self.catalog.plugin_infos()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn close(self) -> Result<(), TetherError> {
        self.catalog.close().await
    }
}

#[async_trait]
impl Reconfigure for PluginRepository {
    async fn reconfigure(&mut self) {
        self.catalog.reconfigure().await;
    }
}
