// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running gRPC servers and stopping them within a deadline.

use std::time::Duration;

use futures::Stream;
use tether_core::{CloserGroup, Timeouts};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tonic::service::Routes;
use tonic::transport::server::Connected;
use tonic::transport::{Channel, Server};
use tracing::{debug, error, warn};

use crate::layers::{Drain, PluginNameLayer, RecoveryLayer};
use crate::pipe::pipe_net;

/// A spawned gRPC server task.
#[derive(Debug)]
pub struct ServerHandle {
    name: String,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Serve `routes` on `incoming` with the recovery, drain and plugin-name
    /// layers installed, in that order.
    pub fn spawn<I, IO, IE>(name: &str, routes: Routes, incoming: I, drain: &Drain) -> Self
    where
        I: Stream<Item = Result<IO, IE>> + Send + 'static,
        IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
        IO::ConnectInfo: Clone + Send + Sync + 'static,
        IE: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static,
    {
        let shutdown = CancellationToken::new();
        let router = Server::builder()
            .layer(RecoveryLayer)
            .layer(drain.layer())
            .layer(PluginNameLayer::new(name))
            .add_routes(routes);

        let signal = shutdown.clone();
        let server_name = name.to_string();
        let task = tokio::spawn(async move {
            let stopped = async move { signal.cancelled().await };
            if let Err(e) = router.serve_with_incoming_shutdown(incoming, stopped).await {
                error!(server = %server_name, error = %e, "grpc server unexpectedly failed to serve");
            }
        });

        Self {
            name: name.to_string(),
            shutdown,
            task,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the server to stop and wait up to `timeout` for it to finish.
    ///
    /// Returns `true` if the server stopped gracefully, `false` if it had to
    /// be aborted.
    pub async fn graceful_stop_with_timeout(mut self, timeout: Duration) -> bool {
        self.shutdown.cancel();
        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(_) => true,
            Err(_) => {
                self.task.abort();
                false
            }
        }
    }

    /// Closer that stops the server gracefully, forcing it after `timeout`.
    pub fn into_closer(self, timeout: Duration) -> CloserGroup {
        let mut closers = CloserGroup::new();
        closers.push_fn(move || async move {
            let name = self.name.clone();
            if self.graceful_stop_with_timeout(timeout).await {
                debug!(server = %name, "grpc server stopped");
            } else {
                warn!(server = %name, ?timeout, "forced grpc server to stop after timeout");
            }
            Ok(())
        });
        closers
    }
}

/// Serve `routes` over an in-memory pipe and return a channel to it.
///
/// The returned closers stop the server, wait for in-flight requests and
/// close the pipe listener, in that order.
pub fn start_pipe_server(name: &str, routes: Routes, timeouts: &Timeouts) -> (Channel, CloserGroup) {
    let (dialer, listener) = pipe_net();
    let close_listener = listener.close_token();
    let drain = Drain::new();
    let handle = ServerHandle::spawn(name, routes, listener.incoming(), &drain);

    let mut closers = CloserGroup::new();
    closers.push_fn(move || async move {
        close_listener.cancel();
        Ok(())
    });
    let drain_timeout = timeouts.drain;
    let drain_name = name.to_string();
    closers.push_fn(move || async move {
        if !drain.wait(drain_timeout).await {
            warn!(server = %drain_name, in_flight = drain.in_flight(), "timed out waiting for requests to drain");
        }
        Ok(())
    });
    closers.push(handle.into_closer(timeouts.graceful_stop));

    (dialer.channel(), closers)
}
