// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared state embedded in every capability facade.

use tonic::Status;
use tracing::Span;

use crate::api::FacadeBinding;
use crate::types::PluginInfo;

#[derive(Debug, Clone)]
pub struct Facade {
    info: PluginInfo,
    span: Span,
    prefix: String,
}

impl Facade {
    pub fn new(binding: &FacadeBinding) -> Self {
        let info = binding.info.clone();
        let prefix = format!("{}({}): ", info.plugin_type().to_lowercase(), info.name());
        Self {
            info,
            span: binding.span.clone(),
            prefix,
        }
    }

    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Prefix a plugin's status message with `type(name): `, exactly once.
    pub fn wrap_status(&self, status: Status) -> Status {
        if status.message().starts_with(&self.prefix) {
            return status;
        }
        Status::with_details_and_metadata(
            status.code(),
            format!("{}{}", self.prefix, status.message()),
            status.details().to_vec().into(),
            status.metadata().clone(),
        )
    }

    /// A new status attributed to this plugin.
    pub fn error(&self, code: tonic::Code, message: impl std::fmt::Display) -> Status {
        Status::new(code, format!("{}{message}", self.prefix))
    }
}
