// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host-side plugin catalog for Tether.
//!
//! [`Catalog::load`] starts every configured plugin (in-process built-ins or
//! external processes), runs the bootstrap handshake, binds the services
//! each plugin advertises into the host's typed repositories, pushes its
//! configuration and finally checks each repository's cardinality
//! constraint. Any failure unwinds everything that was loaded.

pub mod binder;
pub mod builtin;
pub mod catalog;
pub mod config;
pub mod configure;
pub mod external;
mod plugin;

pub use binder::{BindOutcome, BindTarget, PluginBinder, Repos, Repository, ServiceBinder};
pub use builtin::{BuiltIn, BuiltInRegistry};
pub use catalog::Catalog;
pub use config::{CatalogConfig, DataSource, FileData, FixedData, PluginConfig};
pub use configure::{
    configure_plugin, hash_config, reconfigure_on_signal, ConfigurerV1, Reconfigurable,
    Reconfigure,
};
pub use external::{file_checksum, parse_checksum, verify_checksum};
pub use plugin::LoadedPlugin;
