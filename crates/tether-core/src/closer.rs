// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered teardown.
//!
//! Resources are pushed onto a [`CloserGroup`] in the order they are
//! acquired. Closing the group runs them in reverse, so a server is stopped
//! before its listener goes away and `Deinit` reaches a plugin before its
//! transport is torn down. A failing closer never stops the rest.

use std::future::Future;

use async_trait::async_trait;

use crate::error::TetherError;

/// A single teardown action, run at most once.
#[async_trait]
pub trait Closer: Send {
    async fn close(self: Box<Self>) -> Result<(), TetherError>;
}

/// Adapts an async closure into a [`Closer`].
pub struct CloserFn<F>(F);

/// Build a [`Closer`] from an async closure.
pub fn closer_fn<F, Fut>(f: F) -> CloserFn<F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), TetherError>> + Send + 'static,
{
    CloserFn(f)
}

#[async_trait]
impl<F, Fut> Closer for CloserFn<F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), TetherError>> + Send + 'static,
{
    async fn close(self: Box<Self>) -> Result<(), TetherError> {
        (self.0)().await
    }
}

/// Teardown actions closed in reverse insertion order.
#[derive(Default)]
pub struct CloserGroup {
    closers: Vec<Box<dyn Closer>>,
}

impl CloserGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<C: Closer + 'static>(&mut self, closer: C) {
        self.closers.push(Box::new(closer));
    }

    pub fn push_fn<F, Fut>(&mut self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), TetherError>> + Send + 'static,
    {
        self.push(closer_fn(f));
    }

    pub fn len(&self) -> usize {
        self.closers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closers.is_empty()
    }

    /// Run every closer, last pushed first, and collect all failures.
    pub async fn close(self) -> Result<(), TetherError> {
        let mut errors = Vec::new();
        for closer in self.closers.into_iter().rev() {
            if let Err(e) = closer.close().await {
                errors.push(e);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(TetherError::Close(errors))
        }
    }
}

#[async_trait]
impl Closer for CloserGroup {
    async fn close(self: Box<Self>) -> Result<(), TetherError> {
        (*self).close().await
    }
}

impl std::fmt::Debug for CloserGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloserGroup")
            .field("closers", &self.closers.len())
            .finish()
    }
}
