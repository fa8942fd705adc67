// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A connected plugin and what it takes to unload it.

use std::time::Duration;

use tether_core::{CloserGroup, PluginInfo, TetherError};
use tether_rpc::bootstrap;
use tonic::transport::Channel;
use tracing::{info, warn, Instrument, Span};

/// A live gRPC channel to a plugin plus the transport's teardown.
pub(crate) struct Connection {
    pub channel: Channel,
    pub closers: CloserGroup,
}

/// A plugin that completed bootstrap.
#[derive(Debug)]
pub struct LoadedPlugin {
    info: PluginInfo,
    service_names: Vec<String>,
    channel: Channel,
    span: Span,
    closers: CloserGroup,
}

impl LoadedPlugin {
    /// Run `Init` on a fresh connection.
    ///
    /// On failure the connection is closed before the error is returned. On
    /// success a `Deinit` closer is pushed after the transport's closers so
    /// it runs first at teardown.
    pub(crate) async fn bootstrap(
        info: PluginInfo,
        connection: Connection,
        host_service_names: Vec<String>,
        init_timeout: Duration,
        deinit_timeout: Duration,
        span: Span,
    ) -> Result<Self, TetherError> {
        let Connection {
            channel,
            mut closers,
        } = connection;

        let init = tokio::time::timeout(
            init_timeout,
            bootstrap::init(channel.clone(), host_service_names),
        )
        .await
        .unwrap_or_else(|_| {
            Err(TetherError::Timeout {
                operation: "plugin init".into(),
                duration: init_timeout,
            })
        });

        let service_names = match init {
            Ok(names) => names,
            Err(e) => {
                if let Err(close_err) = closers.close().await {
                    warn!(parent: &span, error = %close_err, "failed to close plugin after init failure");
                }
                return Err(e);
            }
        };

        let deinit_channel = channel.clone();
        let deinit_span = span.clone();
        closers.push_fn(move || {
            async move {
                match tokio::time::timeout(deinit_timeout, bootstrap::deinit(deinit_channel)).await {
                    Ok(res) => res,
                    Err(_) => Err(TetherError::Timeout {
                        operation: "plugin deinit".into(),
                        duration: deinit_timeout,
                    }),
                }
            }
            .instrument(deinit_span)
        });

        Ok(Self {
            info,
            service_names,
            channel,
            span,
            closers,
        })
    }

    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// gRPC services the plugin advertised during `Init`.
    pub fn service_names(&self) -> &[String] {
        &self.service_names
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub(crate) async fn unload(self) -> Result<(), TetherError> {
        let Self { span, closers, .. } = self;
        async move {
            info!("unloading plugin");
            let res = closers.close().await;
            match &res {
                Ok(()) => info!("unloaded plugin"),
                Err(e) => warn!(error = %e, "plugin unloaded with errors"),
            }
            res
        }
        .instrument(span)
        .await
    }
}
