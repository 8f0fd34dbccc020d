//! Registry of cost sources.
//!
//! The registry is built once at startup and then only read: the engine
//! iterates it in registration order for every resource.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::PluginClient;
use crate::error::PluginError;
use crate::host::launcher::PluginLaunchConfig;
use crate::settings::HostSettings;
use crate::source::CostSource;

// ============================================================================
// Launch Report
// ============================================================================

/// A plugin that could not be loaded.
#[derive(Debug)]
pub struct LoadFailure {
    /// Configured plugin name.
    pub name: String,
    /// Why it failed.
    pub error: PluginError,
}

/// Outcome of [`ClientRegistry::launch_all`].
#[derive(Debug, Default)]
pub struct LaunchReport {
    /// Registry of the plugins that started.
    pub registry: ClientRegistry,
    /// Plugins that did not.
    pub failures: Vec<LoadFailure>,
}

// ============================================================================
// Client Registry
// ============================================================================

/// Ordered set of uniquely named cost sources.
#[derive(Default, Clone)]
pub struct ClientRegistry {
    sources: Vec<Arc<dyn CostSource>>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from sources, rejecting duplicate names.
    pub fn with_sources<I>(sources: I) -> Result<Self, PluginError>
    where
        I: IntoIterator<Item = Arc<dyn CostSource>>,
    {
        let mut registry = Self::new();
        for source in sources {
            registry.register(source)?;
        }
        Ok(registry)
    }

    /// Appends a source. Fails if the name is taken.
    pub fn register(&mut self, source: Arc<dyn CostSource>) -> Result<(), PluginError> {
        let name = source.name();
        if self.get(name).is_some() {
            return Err(PluginError::DuplicateName(name.to_string()));
        }
        debug!(source = %name, position = self.sources.len(), "Registered cost source");
        self.sources.push(source);
        Ok(())
    }

    /// Looks up a source by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn CostSource>> {
        self.sources.iter().find(|s| s.name() == name)
    }

    /// Sources in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn CostSource>> {
        self.sources.iter()
    }

    /// Source names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if no sources are registered.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Launches every plugin concurrently and registers those that start.
    ///
    /// Registration follows the order of `plugins`. Failures are logged and
    /// reported, never fatal.
    pub async fn launch_all(plugins: &[PluginLaunchConfig], settings: &HostSettings) -> LaunchReport {
        let launches = plugins
            .iter()
            .map(|config| PluginClient::launch(config, settings));
        let outcomes = join_all(launches).await;

        let mut report = LaunchReport::default();
        for (config, outcome) in plugins.iter().zip(outcomes) {
            let error = match outcome {
                Ok(client) => {
                    let client = Arc::new(client);
                    match report.registry.register(client.clone()) {
                        Ok(()) => continue,
                        Err(e) => {
                            client.close().await;
                            e
                        }
                    }
                }
                Err(e) => e,
            };

            warn!(plugin = %config.name, error = %error, "Failed to load plugin");
            report.failures.push(LoadFailure {
                name: config.name.clone(),
                error,
            });
        }

        info!(
            loaded = report.registry.len(),
            failed = report.failures.len(),
            "Plugins launched"
        );
        report
    }

    /// Closes every source.
    pub async fn close_all(&self) {
        join_all(self.sources.iter().map(|s| s.close())).await;
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("sources", &self.names())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use plancost_core::{CostResult, ResourceDescriptor};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NamedSource {
        name: &'static str,
        closes: AtomicUsize,
    }

    impl NamedSource {
        fn arc(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                closes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CostSource for NamedSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn get_projected_cost(
            &self,
            resources: &[ResourceDescriptor],
        ) -> Result<Vec<CostResult>, PluginError> {
            Ok(resources.iter().map(|r| CostResult::new(r, self.name)).collect())
        }

        async fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_registration_order_preserved() {
        let registry = ClientRegistry::with_sources([
            NamedSource::arc("zeta") as Arc<dyn CostSource>,
            NamedSource::arc("alpha"),
            NamedSource::arc("mid"),
        ])
        .unwrap();

        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ClientRegistry::new();
        registry.register(NamedSource::arc("aws")).unwrap();

        let err = registry.register(NamedSource::arc("aws")).unwrap_err();
        assert!(matches!(err, PluginError::DuplicateName(name) if name == "aws"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_close_all() {
        let a = NamedSource::arc("a");
        let b = NamedSource::arc("b");
        let registry =
            ClientRegistry::with_sources([a.clone() as Arc<dyn CostSource>, b.clone()]).unwrap();

        registry.close_all().await;
        assert_eq!(a.closes.load(Ordering::SeqCst), 1);
        assert_eq!(b.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_launch_all_skips_failures() {
        let plugins = vec![
            PluginLaunchConfig::new("ghost", "definitely_not_a_plugin_12345"),
            PluginLaunchConfig::new("phantom", "/nonexistent/plancost-plugin-phantom"),
        ];

        let report = ClientRegistry::launch_all(&plugins, &HostSettings::default()).await;
        assert!(report.registry.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].name, "ghost");
        assert!(matches!(report.failures[1].error, PluginError::Launch(_)));
    }

    #[tokio::test]
    async fn test_launch_all_empty() {
        let report = ClientRegistry::launch_all(&[], &HostSettings::default()).await;
        assert!(report.registry.is_empty());
        assert!(report.failures.is_empty());
    }
}
