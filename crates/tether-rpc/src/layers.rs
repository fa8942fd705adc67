// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tower layers applied to every Tether gRPC server.
//!
//! - [`RecoveryLayer`] turns a panicking handler into an `Internal` status.
//! - [`DrainLayer`] tracks in-flight requests so teardown can wait for them.
//! - [`PluginNameLayer`] tags each request with the plugin it belongs to.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use tokio_util::task::TaskTracker;
use tonic::body::BoxBody;
use tower::{Layer, Service};
use tracing::{error, info_span, Instrument};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryLayer;

impl<S> Layer<S> for RecoveryLayer {
    type Service = Recovery<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Recovery { inner }
    }
}

#[derive(Debug, Clone)]
pub struct Recovery<S> {
    inner: S,
}

impl<S, B> Service<http::Request<B>> for Recovery<S>
where
    S: Service<http::Request<B>, Response = http::Response<BoxBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let method = req.uri().path().to_string();
        let inner = &mut self.inner;
        let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| inner.call(req))) {
            Ok(fut) => fut,
            Err(panic) => return Box::pin(async move { Ok(recovered(&method, panic)) }),
        };
        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(res) => res,
                Err(panic) => Ok(recovered(&method, panic)),
            }
        })
    }
}

fn recovered(method: &str, panic: Box<dyn Any + Send>) -> http::Response<BoxBody> {
    let message = panic_message(panic.as_ref());
    let backtrace = std::backtrace::Backtrace::force_capture();
    error!(method, panic = %message, %backtrace, "recovered from panic in grpc handler");
    tonic::Status::internal(format!("panic in {method}: {message}")).into_http()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Tracks in-flight requests of one server.
#[derive(Debug, Clone, Default)]
pub struct Drain {
    tracker: TaskTracker,
}

impl Drain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(&self) -> DrainLayer {
        DrainLayer {
            tracker: self.tracker.clone(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting work and wait for in-flight requests.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn wait(&self, timeout: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct DrainLayer {
    tracker: TaskTracker,
}

impl<S> Layer<S> for DrainLayer {
    type Service = Drained<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Drained {
            inner,
            tracker: self.tracker.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Drained<S> {
    inner: S,
    tracker: TaskTracker,
}

impl<S, B> Service<http::Request<B>> for Drained<S>
where
    S: Service<http::Request<B>>,
    S::Response: 'static,
    S::Error: 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let token = self.tracker.token();
        let fut = self.inner.call(req);
        Box::pin(async move {
            let _token = token;
            fut.await
        })
    }
}

/// Name of the plugin a request was made by or on behalf of.
///
/// Available to handlers through `tonic::Request::extensions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginName(pub Arc<str>);

#[derive(Debug, Clone)]
pub struct PluginNameLayer {
    name: Arc<str>,
}

impl PluginNameLayer {
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }
}

impl<S> Layer<S> for PluginNameLayer {
    type Service = PluginNamed<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PluginNamed {
            inner,
            name: Arc::clone(&self.name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PluginNamed<S> {
    inner: S,
    name: Arc<str>,
}

impl<S, B> Service<http::Request<B>> for PluginNamed<S>
where
    S: Service<http::Request<B>>,
    S::Response: 'static,
    S::Error: 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let span = info_span!(
            "grpc_request",
            plugin_name = %self.name,
            method = %req.uri().path()
        );
        req.extensions_mut().insert(PluginName(Arc::clone(&self.name)));
        let fut = span.in_scope(|| self.inner.call(req));
        Box::pin(fut.instrument(span))
    }
}
