// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Matching a plugin's advertised services against capability repositories.
//!
//! Repositories are typed ([`ServiceRepo`] / [`PluginRepo`]); the catalog
//! drives them through the object-safe [`ServiceBinder`] / [`PluginBinder`]
//! views provided by blanket impls.

use std::collections::BTreeSet;
use std::sync::Arc;

use tether_core::{
    Configurer, Constraints, FacadeBinding, PluginInfo, PluginRepo, ServiceRepo, TetherError,
};
use tonic::transport::Channel;
use tracing::{debug, warn, Span};

use crate::configure::ConfigurerRepo;

/// The plugin a facade is being bound for.
#[derive(Debug, Clone)]
pub struct BindTarget {
    pub info: PluginInfo,
    pub span: Span,
    pub channel: Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    Bound(&'static str),
    /// Some advertised services matched but none had the requested version.
    VersionMismatch,
    NoMatch,
}

/// Object-safe view of a [`ServiceRepo`].
pub trait ServiceBinder: Send {
    /// Bind the most preferred version present in `offered`.
    ///
    /// Every matching service name is removed from `offered`, bound or not.
    fn bind_offered(
        &mut self,
        target: &BindTarget,
        offered: &mut BTreeSet<String>,
        requested_version: Option<u32>,
    ) -> BindOutcome;

    fn clear(&mut self);
}

/// Object-safe view of a [`PluginRepo`].
pub trait PluginBinder: ServiceBinder {
    fn plugin_types(&self) -> &'static [&'static str];

    fn constraints(&self) -> Constraints;

    fn serves(&self, plugin_type: &str) -> bool {
        self.plugin_types().contains(&plugin_type)
    }
}

impl<R: ServiceRepo> ServiceBinder for R {
    fn bind_offered(
        &mut self,
        target: &BindTarget,
        offered: &mut BTreeSet<String>,
        requested_version: Option<u32>,
    ) -> BindOutcome {
        let versions = self.versions();
        let preferred = versions
            .iter()
            .find(|v| !v.deprecated())
            .map(|v| v.grpc_service_name());

        let mut outcome = BindOutcome::NoMatch;
        for version in &versions {
            let service = version.grpc_service_name();
            if !offered.remove(service) || matches!(outcome, BindOutcome::Bound(_)) {
                continue;
            }
            if requested_version.is_some_and(|v| v != version.version()) {
                outcome = BindOutcome::VersionMismatch;
                continue;
            }

            if version.deprecated() {
                match preferred {
                    Some(recommended) => warn!(
                        parent: &target.span,
                        service,
                        recommended,
                        "plugin implements a deprecated interface, consider upgrading"
                    ),
                    None => warn!(parent: &target.span, service, "plugin implements a deprecated interface"),
                }
            }

            let facade = version.new_facade(FacadeBinding {
                info: target.info.clone(),
                span: target.span.clone(),
                channel: target.channel.clone(),
            });
            self.bind(&target.info, facade);
            debug!(parent: &target.span, service, "bound plugin service");
            outcome = BindOutcome::Bound(service);
        }
        outcome
    }

    fn clear(&mut self) {
        ServiceRepo::clear(self);
    }
}

impl<R: PluginRepo> PluginBinder for R {
    fn plugin_types(&self) -> &'static [&'static str] {
        PluginRepo::plugin_types(self)
    }

    fn constraints(&self) -> Constraints {
        PluginRepo::constraints(self)
    }
}

/// Mutable access to every repository of a host, for the duration of a load.
pub struct Repos<'a> {
    pub plugins: Vec<&'a mut dyn PluginBinder>,
    pub services: Vec<&'a mut dyn ServiceBinder>,
}

/// A host's set of capability repositories.
pub trait Repository: Send {
    fn repos(&mut self) -> Repos<'_>;
}

/// Bind one plugin's facades.
///
/// Binds the plugin-type repository first, then every service repository,
/// then the configurer. Returns the plugin's configurer if it has one.
pub(crate) fn bind_plugin(
    target: &BindTarget,
    service_names: &[String],
    requested_version: Option<u32>,
    plugin_repo: &mut dyn PluginBinder,
    service_repos: &mut [&mut dyn ServiceBinder],
) -> Result<Option<Arc<dyn Configurer>>, TetherError> {
    let mut offered: BTreeSet<String> = service_names.iter().cloned().collect();

    let primary = plugin_repo.bind_offered(target, &mut offered, requested_version);
    for repo in service_repos.iter_mut() {
        repo.bind_offered(target, &mut offered, None);
    }
    let mut configurers = ConfigurerRepo::default();
    configurers.bind_offered(target, &mut offered, None);

    match primary {
        BindOutcome::Bound(_) => {}
        BindOutcome::VersionMismatch => {
            return Err(TetherError::Bind {
                plugin: target.info.name().to_string(),
                message: format!(
                    "requested version {} of plugin type {:?} not found",
                    requested_version.unwrap_or_default(),
                    target.info.plugin_type()
                ),
            });
        }
        BindOutcome::NoMatch => {
            return Err(TetherError::Bind {
                plugin: target.info.name().to_string(),
                message: format!(
                    "no supported plugin interface found in: [{}]",
                    service_names.join(", ")
                ),
            });
        }
    }

    for service in &offered {
        warn!(parent: &target.span, service = %service, "unsupported plugin service found");
    }

    Ok(configurers.into_configurer())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tether_core::Version;
    use tonic::transport::Endpoint;
    use tracing_test::traced_test;

    use super::*;

    /// Records which facade version got bound.
    trait Widget: Send + Sync {
        fn label(&self) -> &'static str;
    }

    struct Labelled(&'static str);

    impl Widget for Labelled {
        fn label(&self) -> &'static str {
            self.0
        }
    }

    struct V {
        service: &'static str,
        version: u32,
        deprecated: bool,
    }

    impl Version<dyn Widget> for V {
        fn grpc_service_name(&self) -> &'static str {
            self.service
        }

        fn version(&self) -> u32 {
            self.version
        }

        fn deprecated(&self) -> bool {
            self.deprecated
        }

        fn new_facade(&self, _binding: FacadeBinding) -> Arc<dyn Widget> {
            Arc::new(Labelled(self.service))
        }
    }

    #[derive(Default)]
    struct WidgetRepo {
        bound: Arc<Mutex<Vec<&'static str>>>,
        v2_deprecated: bool,
    }

    impl ServiceRepo for WidgetRepo {
        type Capability = dyn Widget;

        fn versions(&self) -> Vec<Box<dyn Version<dyn Widget>>> {
            vec![
                Box::new(V {
                    service: "widget.v2.Widget",
                    version: 2,
                    deprecated: self.v2_deprecated,
                }),
                Box::new(V {
                    service: "widget.v1.Widget",
                    version: 1,
                    deprecated: true,
                }),
            ]
        }

        fn bind(&mut self, _info: &PluginInfo, facade: Arc<dyn Widget>) {
            self.bound.lock().unwrap().push(facade.label());
        }

        fn clear(&mut self) {
            self.bound.lock().unwrap().clear();
        }
    }

    impl PluginRepo for WidgetRepo {
        fn plugin_types(&self) -> &'static [&'static str] {
            &["Widget", "LegacyWidget"]
        }

        fn constraints(&self) -> Constraints {
            Constraints::ZeroOrMore
        }
    }

    fn target() -> BindTarget {
        BindTarget {
            info: PluginInfo::new("p", "Widget"),
            span: tracing::info_span!("plugin", plugin_name = "p"),
            channel: Endpoint::from_static("http://localhost:1").connect_lazy(),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    #[traced_test]
    async fn most_preferred_version_wins() {
        let mut repo = WidgetRepo::default();
        let bound = Arc::clone(&repo.bound);
        bind_plugin(
            &target(),
            &names(&["widget.v1.Widget", "widget.v2.Widget"]),
            None,
            &mut repo,
            &mut [],
        )
        .unwrap();
        assert_eq!(*bound.lock().unwrap(), vec!["widget.v2.Widget"]);
        assert!(!logs_contain("deprecated"));
        assert!(!logs_contain("unsupported plugin service"));
    }

    #[tokio::test]
    #[traced_test]
    async fn deprecated_match_warns_with_recommendation() {
        let mut repo = WidgetRepo::default();
        let bound = Arc::clone(&repo.bound);
        bind_plugin(&target(), &names(&["widget.v1.Widget"]), None, &mut repo, &mut []).unwrap();
        assert_eq!(*bound.lock().unwrap(), vec!["widget.v1.Widget"]);
        assert!(logs_contain("deprecated interface"));
        assert!(logs_contain("widget.v2.Widget"));
    }

    #[tokio::test]
    #[traced_test]
    async fn deprecated_without_alternative_has_no_recommendation() {
        let mut repo = WidgetRepo {
            v2_deprecated: true,
            ..Default::default()
        };
        bind_plugin(&target(), &names(&["widget.v2.Widget"]), None, &mut repo, &mut []).unwrap();
        assert!(logs_contain("deprecated interface"));
        assert!(!logs_contain("recommended"));
    }

    #[tokio::test]
    async fn requested_version_is_honoured() {
        let mut repo = WidgetRepo::default();
        let bound = Arc::clone(&repo.bound);
        bind_plugin(
            &target(),
            &names(&["widget.v1.Widget", "widget.v2.Widget"]),
            Some(1),
            &mut repo,
            &mut [],
        )
        .unwrap();
        assert_eq!(*bound.lock().unwrap(), vec!["widget.v1.Widget"]);

        let Err(err) =
            bind_plugin(&target(), &names(&["widget.v2.Widget"]), Some(1), &mut repo, &mut [])
        else {
            panic!("binding v2 must fail when v1 is requested");
        };
        assert!(err
            .to_string()
            .contains("requested version 1 of plugin type \"Widget\" not found"));
    }

    #[tokio::test]
    async fn no_match_lists_advertised_services() {
        let mut repo = WidgetRepo::default();
        let Err(err) =
            bind_plugin(&target(), &names(&["x.v1.X", "y.v1.Y"]), None, &mut repo, &mut [])
        else {
            panic!("no interface should match");
        };
        assert!(err
            .to_string()
            .contains("no supported plugin interface found in: [x.v1.X, y.v1.Y]"));
    }

    #[tokio::test]
    #[traced_test]
    async fn leftover_services_warn_once_each() {
        let mut repo = WidgetRepo::default();
        bind_plugin(
            &target(),
            &names(&["widget.v2.Widget", "widget.v1.Widget", "z.v1.Z"]),
            None,
            &mut repo,
            &mut [],
        )
        .unwrap();
        assert!(logs_contain("unsupported plugin service found"));
        assert!(logs_contain("z.v1.Z"));
        // The less preferred match was consumed, not reported.
        logs_assert(|lines: &[&str]| {
            let unsupported: Vec<_> = lines
                .iter()
                .filter(|l| l.contains("unsupported plugin service found"))
                .collect();
            match unsupported.as_slice() {
                [only] if only.contains("z.v1.Z") => Ok(()),
                other => Err(format!("unexpected warnings: {other:?}")),
            }
        });
    }

    /// A service repository binding a secondary interface.
    #[derive(Default)]
    struct GadgetRepo {
        bound: Vec<&'static str>,
    }

    impl ServiceRepo for GadgetRepo {
        type Capability = dyn Widget;

        fn versions(&self) -> Vec<Box<dyn Version<dyn Widget>>> {
            vec![Box::new(V {
                service: "gadget.v1.Gadget",
                version: 1,
                deprecated: false,
            })]
        }

        fn bind(&mut self, _info: &PluginInfo, facade: Arc<dyn Widget>) {
            self.bound.push(facade.label());
        }

        fn clear(&mut self) {
            self.bound.clear();
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn service_repos_consume_their_services() {
        let mut repo = WidgetRepo::default();
        let mut gadgets = GadgetRepo::default();
        bind_plugin(
            &target(),
            &names(&["widget.v2.Widget", "gadget.v1.Gadget"]),
            // The requested version applies to the plugin type only.
            Some(2),
            &mut repo,
            &mut [&mut gadgets],
        )
        .unwrap();
        assert_eq!(gadgets.bound, vec!["gadget.v1.Gadget"]);
        assert_eq!(*repo.bound.lock().unwrap(), vec!["widget.v2.Widget"]);
        assert!(!logs_contain("unsupported plugin service"));
    }

    #[test]
    fn alias_types_are_served() {
        let repo = WidgetRepo::default();
        assert!(PluginBinder::serves(&repo, "LegacyWidget"));
        assert!(!PluginBinder::serves(&repo, "Other"));
    }
}
