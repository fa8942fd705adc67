// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain data shared between the catalog, the facades and the host.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::error::ConstraintViolation;

/// Identity of a loaded plugin.
///
/// Cloning is cheap and clones share the build string, which is filled in
/// once the plugin answers its first `Configure` call.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    name: String,
    plugin_type: String,
    tags: Vec<String>,
    version: u32,
    build: Arc<ArcSwap<String>>,
}

impl PluginInfo {
    pub fn new(name: impl Into<String>, plugin_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plugin_type: plugin_type.into(),
            tags: Vec::new(),
            version: 1,
            build: Arc::new(ArcSwap::from_pointee(String::new())),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plugin_type(&self) -> &str {
        &self.plugin_type
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Facade version requested in the plugin's configuration, or 1 when
    /// none was. Without a request the binder may bind a newer version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Build string reported by the plugin, empty until configured.
    pub fn build(&self) -> String {
        self.build.load().as_ref().clone()
    }

    pub fn set_build(&self, build: impl Into<String>) {
        self.build.store(Arc::new(build.into()));
    }
}

/// How many plugins of a type may be loaded at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraints {
    ExactlyOne,
    MaybeOne,
    AtLeastOne,
    ZeroOrMore,
}

impl Constraints {
    /// Check a load count against this constraint.
    pub fn check(self, count: usize) -> Result<(), ConstraintViolation> {
        match self {
            Constraints::ExactlyOne if count != 1 => Err(ConstraintViolation::ExactlyOne(count)),
            Constraints::MaybeOne if count > 1 => Err(ConstraintViolation::AtMostOne(count)),
            Constraints::AtLeastOne if count < 1 => Err(ConstraintViolation::AtLeastOne(count)),
            _ => Ok(()),
        }
    }
}

/// Deadlines applied while loading and unloading plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Dial, handshake and `Init`.
    pub init: Duration,
    /// The `Deinit` call made right before teardown.
    pub deinit: Duration,
    /// Graceful stop of a gRPC server before it is forced.
    pub graceful_stop: Duration,
    /// Waiting for in-flight requests to drain.
    pub drain: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            init: Duration::from_secs(10 * 60),
            deinit: Duration::from_secs(60),
            graceful_stop: Duration::from_secs(60),
            drain: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn constraint_messages() {
        assert_eq!(
            Constraints::ExactlyOne.check(0).unwrap_err().to_string(),
            "expected exactly 1 but got 0"
        );
        assert_eq!(
            Constraints::MaybeOne.check(2).unwrap_err().to_string(),
            "expected at most 1 but got 2"
        );
        assert_eq!(
            Constraints::AtLeastOne.check(0).unwrap_err().to_string(),
            "expected at least 1 but got 0"
        );
    }

    proptest! {
        #[test]
        fn constraint_law(count in 0usize..64) {
            prop_assert_eq!(Constraints::ExactlyOne.check(count).is_ok(), count == 1);
            prop_assert_eq!(Constraints::MaybeOne.check(count).is_ok(), count <= 1);
            prop_assert_eq!(Constraints::AtLeastOne.check(count).is_ok(), count >= 1);
            prop_assert!(Constraints::ZeroOrMore.check(count).is_ok());
        }
    }

    #[test]
    fn build_is_shared_between_clones() {
        let info = PluginInfo::new("mail", "Notification");
        let clone = info.clone();
        assert_eq!(clone.build(), "");
        info.set_build("mail 1.2.3");
        assert_eq!(clone.build(), "mail 1.2.3");
    }

    #[test]
    fn version_defaults_to_one() {
        assert_eq!(PluginInfo::new("kms", "KeyManagement").version(), 1);
        let pinned = PluginInfo::new("kms", "KeyManagement").with_version(2);
        assert_eq!(pinned.version(), 2);
    }

    #[test]
    fn default_timeouts() {
        let t = Timeouts::default();
        assert_eq!(t.init, Duration::from_secs(600));
        assert_eq!(t.deinit, Duration::from_secs(60));
        assert_eq!(t.graceful_stop, Duration::from_secs(60));
    }
}
