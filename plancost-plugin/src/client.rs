//! Plugin client.
//!
//! A [`PluginClient`] owns one plugin's RPC channel and process. Connecting
//! asks the plugin for its name and metadata and checks its protocol
//! version against [`SPEC_VERSION`]. A version mismatch is only a warning:
//! the client stays usable.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use plancost_core::{CostResult, PricingSpec, ResourceDescriptor};

use crate::error::PluginError;
use crate::host::launcher::{PluginLaunchConfig, PluginProcess, ProcessLauncher};
use crate::protocol::{
    ActualCostParams, CostResponse, EmptyParams, NameResponse, PluginCost, PluginInfo,
    PricingSpecResponse, ProjectedCostParams, ResourceParams, SPEC_VERSION, SupportsResponse,
    methods,
};
use crate::rpc::RpcChannel;
use crate::settings::HostSettings;
use crate::source::{ActualCostRequest, CostSource};

// ============================================================================
// Version Negotiation
// ============================================================================

/// Returns true if two protocol versions share a major version.
///
/// A leading `v` is accepted. Unparsable versions are incompatible.
pub fn is_spec_compatible(host: &str, plugin: &str) -> bool {
    let parse = |v: &str| semver::Version::parse(v.trim().trim_start_matches('v'));
    match (parse(host), parse(plugin)) {
        (Ok(host), Ok(plugin)) => host.major == plugin.major,
        _ => false,
    }
}

// ============================================================================
// Plugin Metadata
// ============================================================================

/// What the host learned about a plugin while connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    /// Plugin name, as reported or as configured.
    pub name: String,
    /// Plugin release version.
    pub version: Option<String>,
    /// Protocol version the plugin reported.
    pub spec_version: Option<String>,
    /// Whether the plugin's major protocol version matches the host's.
    pub spec_version_compatible: bool,
    /// The plugin predates `GetPluginInfo`.
    pub legacy: bool,
    /// `GetPluginInfo` timed out or the transport failed.
    pub info_probe_failed: bool,
    /// Providers the plugin prices.
    pub providers: Vec<String>,
}

impl PluginMetadata {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            spec_version: None,
            spec_version_compatible: true,
            legacy: false,
            info_probe_failed: false,
            providers: Vec::new(),
        }
    }

    fn apply_info(&mut self, info: PluginInfo) {
        if !info.version.is_empty() {
            self.version = Some(info.version);
        }
        self.providers = info.providers;

        match info.spec_version {
            Some(reported) => {
                self.spec_version_compatible = is_spec_compatible(SPEC_VERSION, &reported);
                if self.spec_version_compatible {
                    debug!(plugin = %self.name, spec_version = %reported, "Protocol version compatible");
                } else {
                    warn!(
                        plugin = %self.name,
                        plugin_spec = %reported,
                        host_spec = SPEC_VERSION,
                        "Plugin protocol version mismatch, results may be unreliable"
                    );
                }
                self.spec_version = Some(reported);
            }
            None => debug!(plugin = %self.name, "Plugin did not report a protocol version"),
        }
    }
}

// ============================================================================
// Plugin Client
// ============================================================================

/// RPC client for one plugin.
#[derive(Debug)]
pub struct PluginClient {
    metadata: PluginMetadata,
    channel: RpcChannel,
    process: Mutex<Option<PluginProcess>>,
    settings: HostSettings,
    closed: AtomicBool,
}

impl PluginClient {
    /// Launches a plugin and connects to it.
    #[instrument(skip(config, settings), fields(plugin = %config.name))]
    pub async fn launch(
        config: &PluginLaunchConfig,
        settings: &HostSettings,
    ) -> Result<Self, PluginError> {
        let launcher = ProcessLauncher::new(settings.clone());
        let (process, connection) = launcher.launch(config).await?;
        let channel = connection.into_channel(&config.name);

        let mut client = Self::connect(&config.name, channel, Some(process), settings.clone()).await;
        if client.metadata.version.is_none() {
            client.metadata.version.clone_from(&config.version);
        }

        info!(
            plugin = %client.name(),
            version = ?client.metadata.version,
            compatible = client.metadata.spec_version_compatible,
            "Plugin loaded"
        );
        Ok(client)
    }

    /// Builds a client over an established channel.
    ///
    /// Never fails: metadata calls that go wrong are logged and recorded in
    /// [`PluginMetadata`].
    pub async fn connect(
        configured_name: &str,
        channel: RpcChannel,
        process: Option<PluginProcess>,
        settings: HostSettings,
    ) -> Self {
        let name = match channel
            .call::<_, NameResponse>(methods::NAME, EmptyParams {}, settings.probe_timeout)
            .await
        {
            Ok(response) if !response.name.trim().is_empty() => response.name,
            Ok(_) => configured_name.to_string(),
            Err(e) => {
                debug!(plugin = %configured_name, error = %e, "Name call failed, using configured name");
                configured_name.to_string()
            }
        };

        let mut metadata = PluginMetadata::new(name);
        match channel
            .call::<_, PluginInfo>(methods::GET_PLUGIN_INFO, EmptyParams {}, settings.probe_timeout)
            .await
        {
            Ok(info) => metadata.apply_info(info),
            Err(e) if e.is_unimplemented() => {
                debug!(plugin = %metadata.name, "Legacy plugin without GetPluginInfo");
                metadata.legacy = true;
            }
            Err(e) => {
                warn!(plugin = %metadata.name, error = %e, "Plugin info probe failed");
                metadata.info_probe_failed = true;
            }
        }

        Self {
            metadata,
            channel,
            process: Mutex::new(process),
            settings,
            closed: AtomicBool::new(false),
        }
    }

    /// Metadata gathered while connecting.
    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    /// Returns true once [`close`](Self::close) ran or the plugin went away.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.channel.is_closed()
    }

    /// Sends `Shutdown`, closes the channel and stops the process.
    ///
    /// Later calls do nothing.
    #[instrument(skip(self), fields(plugin = %self.metadata.name))]
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Err(e) = self
            .channel
            .notify(methods::SHUTDOWN, EmptyParams {}, self.settings.probe_timeout)
            .await
        {
            debug!(error = %e, "Shutdown notification not sent");
        }
        self.channel.close();

        if let Some(mut process) = self.process.lock().await.take() {
            process.shutdown(self.settings.shutdown_grace).await;
        }
    }

    async fn call<P, T>(&self, method: &'static str, params: P) -> Result<T, PluginError>
    where
        P: serde::Serialize + Send,
        T: serde::de::DeserializeOwned,
    {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PluginError::Closed(self.metadata.name.clone()));
        }

        self.channel
            .call(method, params, self.settings.request_timeout)
            .await
            .map_err(|e| PluginError::rpc(&self.metadata.name, method, e))
    }

    /// Pairs reported costs with the requested resources by id.
    fn attach(&self, resources: &[ResourceDescriptor], costs: Vec<PluginCost>) -> Vec<CostResult> {
        let mut results = Vec::with_capacity(costs.len());
        for cost in costs {
            let resource = if cost.resource_id.is_empty() && resources.len() == 1 {
                resources.first()
            } else {
                resources.iter().find(|r| r.id() == cost.resource_id)
            };

            match resource {
                Some(resource) => results.push(cost.into_result(resource, &self.metadata.name)),
                None => warn!(
                    plugin = %self.metadata.name,
                    resource_id = %cost.resource_id,
                    "Ignoring cost for a resource that was not requested"
                ),
            }
        }
        results
    }
}

#[async_trait]
impl CostSource for PluginClient {
    fn name(&self) -> &str {
        &self.metadata.name
    }

    async fn supports(&self, resource: &ResourceDescriptor) -> Result<SupportsResponse, PluginError> {
        self.call(methods::SUPPORTS, ResourceParams { resource }).await
    }

    async fn get_projected_cost(
        &self,
        resources: &[ResourceDescriptor],
    ) -> Result<Vec<CostResult>, PluginError> {
        let response: CostResponse = self
            .call(methods::GET_PROJECTED_COST, ProjectedCostParams { resources })
            .await?;
        Ok(self.attach(resources, response.results))
    }

    async fn get_actual_cost(
        &self,
        request: &ActualCostRequest,
    ) -> Result<Vec<CostResult>, PluginError> {
        let response: CostResponse = self
            .call(methods::GET_ACTUAL_COST, ActualCostParams::new(request))
            .await?;
        Ok(self.attach(&request.resources, response.results))
    }

    async fn get_pricing_spec(
        &self,
        resource: &ResourceDescriptor,
    ) -> Result<Option<PricingSpec>, PluginError> {
        let response: PricingSpecResponse = self
            .call(methods::GET_PRICING_SPEC, ResourceParams { resource })
            .await?;

        Ok(response.spec.map(|mut spec| {
            if spec.source.is_empty() {
                spec.source.clone_from(&self.metadata.name);
            }
            spec
        }))
    }

    async fn close(&self) {
        PluginClient::close(self).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
