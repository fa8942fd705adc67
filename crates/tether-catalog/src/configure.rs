// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pushing configuration to plugins, initially and on reload.

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha512};
use tether_core::{Configurer, Facade, FacadeBinding, PluginInfo, ServiceRepo, TetherError, Version};
use tether_proto::config::v1::config_client::ConfigClient;
use tether_proto::config::v1::{ConfigureRequest, CONFIG_SERVICE};
use tokio_util::sync::CancellationToken;
use tonic::transport::Channel;
use tonic::Code;
use tracing::{error, info, Instrument, Span};

use crate::config::{DataSource, FixedData};

/// Content hash used to skip redundant pushes: SHA-512 truncated to 16 bytes.
pub fn hash_config(data: &str) -> String {
    let digest = Sha512::digest(data.as_bytes());
    hex::encode(&digest[..16])
}

/// Load `source` and push it unless its hash equals `last_hash`.
///
/// Returns the hash of the loaded data.
pub async fn configure_plugin(
    configurer: &dyn Configurer,
    source: &dyn DataSource,
    last_hash: Option<&str>,
) -> Result<String, TetherError> {
    let data = source.load().await?;
    let hash = hash_config(&data);
    if last_hash == Some(hash.as_str()) {
        return Ok(hash);
    }
    configurer.configure(&data).await?;
    Ok(hash)
}

/// A plugin whose configuration can be pushed again.
pub struct Reconfigurable {
    configurer: Arc<dyn Configurer>,
    source: Arc<dyn DataSource>,
    last_hash: String,
    span: Span,
}

impl Reconfigurable {
    pub fn last_hash(&self) -> &str {
        &self.last_hash
    }

    pub async fn reconfigure(&mut self) {
        let res = configure_plugin(
            self.configurer.as_ref(),
            self.source.as_ref(),
            Some(&self.last_hash),
        )
        .instrument(self.span.clone())
        .await;

        let _enter = self.span.enter();
        match res {
            Ok(hash) if hash == self.last_hash => {
                info!(hash = %hash, "plugin not reconfigured since the config is unchanged");
            }
            Ok(hash) => {
                info!(old_hash = %self.last_hash, new_hash = %hash, "plugin reconfigured");
                self.last_hash = hash;
            }
            Err(e) => error!(error = %e, "failed to reconfigure plugin"),
        }
    }
}

/// Configure a freshly bound plugin.
///
/// Plugins without a configuration service are skipped. A plugin that has
/// one but was given no data gets an empty document. Only dynamic sources
/// are kept for later reconfiguration.
pub(crate) async fn initial_configure(
    configurer: Option<Arc<dyn Configurer>>,
    source: Option<Arc<dyn DataSource>>,
    span: &Span,
) -> Result<Option<Reconfigurable>, TetherError> {
    let Some(configurer) = configurer else {
        return Ok(None);
    };
    let source: Arc<dyn DataSource> = source.unwrap_or_else(|| Arc::new(FixedData::default()));
    let hash = configure_plugin(configurer.as_ref(), source.as_ref(), None)
        .instrument(span.clone())
        .await?;

    if !source.is_dynamic() {
        return Ok(None);
    }
    Ok(Some(Reconfigurable {
        configurer,
        source,
        last_hash: hash,
        span: span.clone(),
    }))
}

/// Something holding reconfigurable plugins.
#[async_trait]
pub trait Reconfigure: Send {
    async fn reconfigure(&mut self);
}

/// Reconfigure on every SIGUSR1 until `token` is cancelled.
pub async fn reconfigure_on_signal<R: Reconfigure + ?Sized>(
    token: CancellationToken,
    target: &mut R,
) -> Result<(), TetherError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut usr1 = signal(SignalKind::user_defined1())?;
        loop {
            tokio::select! {
                _ = token.cancelled() => return Ok(()),
                received = usr1.recv() => {
                    if received.is_none() {
                        return Ok(());
                    }
                    info!("received SIGUSR1, reconfiguring plugins");
                    target.reconfigure().await;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = target;
        token.cancelled().await;
        Ok(())
    }
}

/// Facade over `tether.config.v1.Config`.
pub struct ConfigurerV1 {
    facade: Facade,
    client: ConfigClient<Channel>,
}

#[async_trait]
impl Configurer for ConfigurerV1 {
    async fn configure(&self, yaml_configuration: &str) -> Result<(), TetherError> {
        let mut client = self.client.clone();
        let req = ConfigureRequest {
            yaml_configuration: yaml_configuration.to_string(),
        };
        match client.configure(req).await {
            Ok(res) => {
                self.facade.info().set_build(res.into_inner().build_info);
                Ok(())
            }
            Err(status) if status.code() == Code::Unimplemented => Ok(()),
            Err(status) => Err(TetherError::Rpc {
                rpc: "Configure",
                status: self.facade.wrap_status(status),
            }),
        }
    }
}

struct ConfigV1;

impl Version<dyn Configurer> for ConfigV1 {
    fn grpc_service_name(&self) -> &'static str {
        CONFIG_SERVICE
    }

    fn new_facade(&self, binding: FacadeBinding) -> Arc<dyn Configurer> {
        Arc::new(ConfigurerV1 {
            facade: Facade::new(&binding),
            client: ConfigClient::new(binding.channel),
        })
    }
}

/// Internal repository catching a plugin's configuration service.
#[derive(Default)]
pub(crate) struct ConfigurerRepo {
    configurer: Option<Arc<dyn Configurer>>,
}

impl ConfigurerRepo {
    pub(crate) fn into_configurer(self) -> Option<Arc<dyn Configurer>> {
        self.configurer
    }
}

impl ServiceRepo for ConfigurerRepo {
    type Capability = dyn Configurer;

    fn versions(&self) -> Vec<Box<dyn Version<dyn Configurer>>> {
        vec![Box::new(ConfigV1)]
    }

    fn bind(&mut self, _info: &PluginInfo, facade: Arc<dyn Configurer>) {
        self.configurer = Some(facade);
    }

    fn clear(&mut self) {
        self.configurer = None;
    }
}
