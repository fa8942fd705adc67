// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tether plugin bridge.

use std::time::Duration;

use thiserror::Error;

/// Boxed error used for foreign sources (transport, process, IO wrappers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type shared by every Tether crate.
#[derive(Debug, Error)]
pub enum TetherError {
    /// Configuration errors (bad checksum, missing name or type, unknown plugin type).
    #[error("configuration error: {0}")]
    Config(String),

    /// Spawning, dialing or serving a plugin transport failed.
    #[error("transport error for plugin {plugin}: {message}")]
    Transport {
        plugin: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The plugin's handshake line was missing or incompatible.
    #[error("handshake with plugin {plugin} failed: {message}")]
    Handshake { plugin: String, message: String },

    /// A bridge RPC returned a status the caller cannot tolerate.
    #[error("{rpc} rpc failed: {}", .status.message())]
    Rpc {
        rpc: &'static str,
        #[source]
        status: tonic::Status,
    },

    /// No facade could be bound for the plugin.
    #[error("failed to bind plugin {plugin}: {message}")]
    Bind { plugin: String, message: String },

    /// A repository's cardinality constraint was violated after loading.
    #[error("plugin type {plugin_type:?} constraint not satisfied: {violation}")]
    Constraint {
        plugin_type: String,
        violation: ConstraintViolation,
    },

    /// Wraps an error with the name of the plugin it came from.
    #[error("plugin {name}: {source}")]
    Plugin {
        name: String,
        #[source]
        source: Box<TetherError>,
    },

    /// One or more teardown actions failed.
    #[error("{}", join_errors(.0))]
    Close(Vec<TetherError>),

    /// Operation timed out.
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TetherError {
    /// Attach the plugin name to an error, unless it already carries one.
    pub fn for_plugin(self, name: &str) -> Self {
        match self {
            err @ TetherError::Plugin { .. } => err,
            err => TetherError::Plugin {
                name: name.to_string(),
                source: Box::new(err),
            },
        }
    }

    /// The gRPC status behind an RPC failure, looking through plugin wrappers.
    pub fn status(&self) -> Option<&tonic::Status> {
        match self {
            TetherError::Rpc { status, .. } => Some(status),
            TetherError::Plugin { source, .. } => source.status(),
            _ => None,
        }
    }
}

/// Violation of a repository's [`Constraints`](crate::Constraints).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConstraintViolation {
    #[error("expected exactly 1 but got {0}")]
    ExactlyOne(usize),
    #[error("expected at most 1 but got {0}")]
    AtMostOne(usize),
    #[error("expected at least 1 but got {0}")]
    AtLeastOne(usize),
}

fn join_errors(errors: &[TetherError]) -> String {
    match errors {
        [] => "no errors".to_string(),
        [only] => only.to_string(),
        many => many
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_error_renders_type_and_violation() {
        let err = TetherError::Constraint {
            plugin_type: "Notification".into(),
            violation: ConstraintViolation::ExactlyOne(2),
        };
        assert_eq!(
            err.to_string(),
            "plugin type \"Notification\" constraint not satisfied: expected exactly 1 but got 2"
        );
    }

    #[test]
    fn for_plugin_wraps_once() {
        let err = TetherError::Internal("boom".into())
            .for_plugin("a")
            .for_plugin("b");
        assert_eq!(err.to_string(), "plugin a: internal error: boom");
    }

    #[test]
    fn status_is_found_through_plugin_wrapper() {
        let err = TetherError::Rpc {
            rpc: "Init",
            status: tonic::Status::internal("bad"),
        }
        .for_plugin("p");
        assert_eq!(err.status().map(|s| s.code()), Some(tonic::Code::Internal));
    }

    #[test]
    fn close_joins_all_messages() {
        let err = TetherError::Close(vec![
            TetherError::Internal("one".into()),
            TetherError::Config("two".into()),
        ]);
        assert_eq!(
            err.to_string(),
            "internal error: one; configuration error: two"
        );
    }
}
