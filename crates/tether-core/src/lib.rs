// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tether plugin bridge.
//!
//! Holds the error type, plugin identity, cardinality constraints, ordered
//! teardown and the traits that connect capability crates to the catalog.

pub mod api;
pub mod closer;
pub mod error;
pub mod facade;
pub mod types;

pub use api::{
    Configurer, FacadeBinding, HostDialer, PluginRepo, PluginServer, ServiceBroker, ServiceRepo,
    ServiceServer, Version,
};
pub use closer::{closer_fn, Closer, CloserGroup};
pub use error::{BoxError, ConstraintViolation, TetherError};
pub use facade::Facade;
pub use types::{Constraints, PluginInfo, Timeouts};
