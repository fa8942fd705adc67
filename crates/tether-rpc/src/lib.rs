// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RPC plumbing for the Tether plugin bridge.
//!
//! Covers the bootstrap protocol, the process handshake, the in-memory pipe
//! network used by built-in plugins, the layers every server runs with and
//! the plugin-side [`serve`] entry point.

pub mod bootstrap;
pub mod dial;
pub mod grpc;
pub mod handshake;
pub mod layers;
pub mod pipe;
pub mod serve;
pub mod server;
pub mod shutdown;

pub use grpc::{GrpcPlugin, GrpcService, ServiceHooks};
pub use layers::PluginName;
pub use serve::serve;
pub use server::{start_pipe_server, ServerHandle};
pub use shutdown::install_signal_handler;
