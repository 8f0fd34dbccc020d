//! Orchestration engine.
//!
//! For each resource the engine asks the registered cost sources in
//! registration order and takes the first answer. Projected-cost queries
//! fall back to local pricing specs; actual-cost queries do not.
//!
//! Every input resource gets exactly one result, in input order. A failing
//! source never stops the batch: its error is recorded and, if nothing else
//! answers, the resource gets an `ERROR:` placeholder.

use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use plancost_core::{
    CostResult, CostResultWithErrors, ErrorDetail, PricingSpec, ResourceDescriptor, TimeRange,
};
use plancost_plugin::{ActualCostRequest, ClientRegistry, CostSource, PluginError};

use crate::error::EngineError;
use crate::spec::{LocalSpecResolver, SpecStore};

// ============================================================================
// Engine Config
// ============================================================================

/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum resources processed at once.
    pub max_concurrency: usize,
    /// Deadline for a whole query. `None` waits indefinitely.
    pub query_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            query_timeout: None,
        }
    }
}

impl EngineConfig {
    /// Sets the concurrency limit. Zero is treated as one.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Sets the query deadline.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }
}

// ============================================================================
// Resource Outcome
// ============================================================================

/// Result and errors for one resource.
#[derive(Debug)]
struct ResourceOutcome {
    result: CostResult,
    errors: Vec<ErrorDetail>,
}

/// Errors collected while trying sources for one resource.
#[derive(Default)]
struct Attempts {
    errors: Vec<ErrorDetail>,
    last_failure: Option<(String, String)>,
}

impl Attempts {
    fn record(&mut self, resource: &ResourceDescriptor, source: &str, error: &PluginError) {
        warn!(resource = %resource.id(), source = %source, error = %error, "Cost source failed");
        self.errors.push(ErrorDetail::new(resource, source, error));
        self.last_failure = Some((source.to_string(), error.to_string()));
    }

    fn finish(self, result: CostResult) -> ResourceOutcome {
        ResourceOutcome {
            result,
            errors: self.errors,
        }
    }

    /// Placeholder for the last failure, or a `none` result.
    fn unanswered(self, resource: &ResourceDescriptor) -> ResourceOutcome {
        let result = match &self.last_failure {
            Some((source, message)) => CostResult::error_placeholder(resource, source, message),
            None => CostResult::none(resource),
        };
        self.finish(result)
    }
}

/// Whether to ask a source about a resource.
enum Support {
    Yes,
    No,
    Failed,
}

// ============================================================================
// Engine
// ============================================================================

/// Fans cost queries out to cost sources and local specs.
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<ClientRegistry>,
    resolver: Arc<LocalSpecResolver>,
    config: EngineConfig,
}

impl Engine {
    /// Creates an engine with no local specs and default config.
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self {
            registry,
            resolver: Arc::new(LocalSpecResolver::default()),
            config: EngineConfig::default(),
        }
    }

    /// Sets the local specs used as a fallback.
    pub fn with_specs(mut self, store: SpecStore) -> Self {
        self.resolver = Arc::new(LocalSpecResolver::new(store));
        self
    }

    /// Sets the config.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The registry queried by this engine.
    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// The config.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Projected monthly cost for every resource.
    #[instrument(skip_all, fields(resources = resources.len()))]
    pub async fn get_projected_cost(
        &self,
        resources: &[ResourceDescriptor],
    ) -> Result<CostResultWithErrors, EngineError> {
        let batch = self.run(resources, |r| self.project_one(r)).await?;
        info!(
            results = batch.results.len(),
            errors = batch.errors.len(),
            total_monthly = batch.total_monthly(),
            "Projected cost query complete"
        );
        Ok(batch)
    }

    /// Historical cost for every resource over `range`.
    ///
    /// Fails before any plugin is called if the range ends before it starts.
    #[instrument(skip_all, fields(resources = resources.len(), start = %range.start, end = %range.end))]
    pub async fn get_actual_cost(
        &self,
        resources: &[ResourceDescriptor],
        range: TimeRange,
    ) -> Result<CostResultWithErrors, EngineError> {
        range.validate()?;
        let batch = self.run(resources, |r| self.actual_one(r, range)).await?;
        info!(
            results = batch.results.len(),
            errors = batch.errors.len(),
            "Actual cost query complete"
        );
        Ok(batch)
    }

    /// Pricing spec for a resource from the first source that has one,
    /// then from local specs.
    #[instrument(skip_all, fields(resource = %resource.id()))]
    pub async fn get_pricing_spec(
        &self,
        resource: &ResourceDescriptor,
    ) -> Result<Option<PricingSpec>, EngineError> {
        let lookup = async {
            for source in self.registry.iter() {
                match source.get_pricing_spec(resource).await {
                    Ok(Some(spec)) => return Some(spec),
                    Ok(None) => {}
                    Err(e) if e.is_unimplemented() => {
                        debug!(source = %source.name(), "GetPricingSpec not implemented");
                    }
                    Err(e) => warn!(source = %source.name(), error = %e, "GetPricingSpec failed"),
                }
            }
            self.resolver.pricing_spec(resource).cloned()
        };
        self.with_deadline(lookup).await
    }

    /// Runs `per_resource` over every resource, preserving input order.
    async fn run<'a, F, Fut>(
        &'a self,
        resources: &'a [ResourceDescriptor],
        per_resource: F,
    ) -> Result<CostResultWithErrors, EngineError>
    where
        F: FnMut(&'a ResourceDescriptor) -> Fut,
        Fut: Future<Output = ResourceOutcome>,
    {
        let work = async {
            let outcomes: Vec<ResourceOutcome> = stream::iter(resources)
                .map(per_resource)
                .buffered(self.config.max_concurrency.max(1))
                .collect()
                .await;

            let mut batch = CostResultWithErrors::new();
            for outcome in outcomes {
                batch.results.push(outcome.result);
                batch.errors.extend(outcome.errors);
            }
            batch
        };
        self.with_deadline(work).await
    }

    async fn with_deadline<F: Future>(&self, work: F) -> Result<F::Output, EngineError> {
        match self.config.query_timeout {
            Some(timeout) => tokio::time::timeout(timeout, work).await.map_err(|_| {
                warn!(?timeout, "Query deadline exceeded");
                EngineError::DeadlineExceeded(timeout)
            }),
            None => Ok(work.await),
        }
    }

    async fn check_support(
        source: &Arc<dyn CostSource>,
        resource: &ResourceDescriptor,
        attempts: &mut Attempts,
    ) -> Support {
        match source.supports(resource).await {
            Ok(answer) if answer.supported => Support::Yes,
            Ok(answer) => {
                debug!(source = %source.name(), resource = %resource.id(), reason = %answer.reason, "Not supported");
                Support::No
            }
            Err(e) if e.is_unimplemented() => Support::Yes,
            Err(e) => {
                attempts.record(resource, source.name(), &e);
                Support::Failed
            }
        }
    }

    async fn project_one(&self, resource: &ResourceDescriptor) -> ResourceOutcome {
        let mut attempts = Attempts::default();

        for source in self.registry.iter() {
            if !matches!(Self::check_support(source, resource, &mut attempts).await, Support::Yes) {
                continue;
            }

            match source.get_projected_cost(std::slice::from_ref(resource)).await {
                Ok(results) => {
                    if let Some(result) = pick(results, resource) {
                        debug!(resource = %resource.id(), source = %source.name(), "Priced by source");
                        return attempts.finish(result);
                    }
                    debug!(resource = %resource.id(), source = %source.name(), "Source returned no result");
                }
                Err(e) => attempts.record(resource, source.name(), &e),
            }
        }

        if let Some(result) = self.resolver.estimate(resource) {
            return attempts.finish(result);
        }
        attempts.unanswered(resource)
    }

    async fn actual_one(&self, resource: &ResourceDescriptor, range: TimeRange) -> ResourceOutcome {
        let mut attempts = Attempts::default();
        let request =
            ActualCostRequest::new(vec![resource.clone()], range).with_tags(resource.tags());

        for source in self.registry.iter() {
            if !matches!(Self::check_support(source, resource, &mut attempts).await, Support::Yes) {
                continue;
            }

            match source.get_actual_cost(&request).await {
                Ok(results) => {
                    if let Some(mut result) = pick(results, resource) {
                        if result.start_date.is_none() {
                            result = result.with_period(range.start, range.end);
                        }
                        return attempts.finish(result);
                    }
                }
                Err(e) if e.is_unimplemented() => {
                    debug!(source = %source.name(), "GetActualCost not implemented");
                }
                Err(e) => attempts.record(resource, source.name(), &e),
            }
        }

        attempts.unanswered(resource)
    }
}

/// The result for `resource` among a source's results.
fn pick(results: Vec<CostResult>, resource: &ResourceDescriptor) -> Option<CostResult> {
    results.into_iter().find(|r| r.resource_id == resource.id())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use plancost_core::{ADAPTER_LOCAL_SPEC, ADAPTER_NONE, BillingMode, CoreError};
    use plancost_plugin::{RpcError, SupportsResponse};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Answer {
        Cost(f64),
        Fail(&'static str),
        Empty,
        Slow(u64, f64),
        Hang,
    }

    struct FakeSource {
        name: &'static str,
        default: Answer,
        overrides: HashMap<&'static str, Answer>,
        unsupported: HashSet<&'static str>,
        supports_unimplemented: bool,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(name: &'static str, default: Answer) -> Self {
            Self {
                name,
                default,
                overrides: HashMap::new(),
                unsupported: HashSet::new(),
                supports_unimplemented: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn on(mut self, id: &'static str, answer: Answer) -> Self {
            self.overrides.insert(id, answer);
            self
        }

        fn unsupported(mut self, id: &'static str) -> Self {
            self.unsupported.insert(id);
            self
        }

        fn legacy(mut self) -> Self {
            self.supports_unimplemented = true;
            self
        }

        async fn answer(&self, resource: &ResourceDescriptor) -> Result<Option<f64>, PluginError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let answer = self
                .overrides
                .get(resource.id())
                .copied()
                .unwrap_or(self.default);
            match answer {
                Answer::Cost(monthly) => Ok(Some(monthly)),
                Answer::Empty => Ok(None),
                Answer::Fail(message) => Err(PluginError::rpc(
                    self.name,
                    "GetProjectedCost",
                    RpcError::Remote {
                        code: -32000,
                        message: message.to_string(),
                    },
                )),
                Answer::Slow(ms, monthly) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(Some(monthly))
                }
                Answer::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(None)
                }
            }
        }
    }

    #[async_trait]
    impl CostSource for FakeSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn supports(&self, resource: &ResourceDescriptor) -> Result<SupportsResponse, PluginError> {
            if self.supports_unimplemented {
                return Err(PluginError::Unimplemented {
                    plugin: self.name.to_string(),
                    method: "Supports",
                });
            }
            if self.unsupported.contains(resource.id()) {
                return Ok(SupportsResponse::unsupported("not mine"));
            }
            Ok(SupportsResponse::supported())
        }

        async fn get_projected_cost(
            &self,
            resources: &[ResourceDescriptor],
        ) -> Result<Vec<CostResult>, PluginError> {
            let resource = &resources[0];
            Ok(self
                .answer(resource)
                .await?
                .map(|m| {
                    CostResult::new(resource, self.name)
                        .with_currency("USD")
                        .with_monthly(m)
                })
                .into_iter()
                .collect())
        }

        async fn get_actual_cost(
            &self,
            request: &ActualCostRequest,
        ) -> Result<Vec<CostResult>, PluginError> {
            let resource = &request.resources[0];
            let days = usize::try_from(request.range.days()).unwrap();
            Ok(self
                .answer(resource)
                .await?
                .map(|daily| {
                    CostResult::new(resource, self.name)
                        .with_currency("USD")
                        .with_daily_costs(vec![daily; days])
                })
                .into_iter()
                .collect())
        }

        async fn get_pricing_spec(
            &self,
            resource: &ResourceDescriptor,
        ) -> Result<Option<PricingSpec>, PluginError> {
            Ok(self
                .answer(resource)
                .await?
                .map(|m| PricingSpec::new("aws", "ec2", self.name).with_rate(m, BillingMode::PerMonth)))
        }
    }

    fn engine(sources: Vec<FakeSource>) -> Engine {
        let registry = ClientRegistry::with_sources(
            sources
                .into_iter()
                .map(|s| Arc::new(s) as Arc<dyn CostSource>),
        )
        .unwrap();
        Engine::new(Arc::new(registry))
    }

    fn instance(id: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(id, "aws:ec2/instance:Instance").with_property("instanceType", "t3.micro")
    }

    fn queue(id: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(id, "gcp:pubsub/topic:Topic")
    }

    fn ec2_specs() -> SpecStore {
        SpecStore::with_specs(vec![
            PricingSpec::new("aws", "ec2", "t3.micro").with_rate(0.0104, BillingMode::PerHour),
        ])
    }

    fn january() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    // ------------------------------------------------------------------------
    // Projected cost
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_no_plugins_uses_local_spec() {
        let engine = engine(vec![]).with_specs(ec2_specs());

        let batch = engine.get_projected_cost(&[instance("web")]).await.unwrap();
        assert_eq!(batch.results[0].adapter, ADAPTER_LOCAL_SPEC);
        assert!((batch.results[0].monthly - 7.592).abs() < 1e-9);
        assert!(!batch.has_errors());
    }

    #[tokio::test]
    async fn test_no_plugins_no_spec_is_none() {
        let engine = engine(vec![]).with_specs(ec2_specs());

        let batch = engine.get_projected_cost(&[queue("events")]).await.unwrap();
        assert_eq!(batch.results[0].adapter, ADAPTER_NONE);
        assert_eq!(batch.results[0].monthly, 0.0);
        assert!(!batch.has_errors());
    }

    #[tokio::test]
    async fn test_plugin_fails_on_one_of_three() {
        let engine = engine(vec![FakeSource::new("A", Answer::Cost(10.0)).on("r2", Answer::Fail("boom"))]);
        let resources = vec![queue("r1"), queue("r2"), queue("r3")];

        let batch = engine.get_projected_cost(&resources).await.unwrap();
        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.results[0].monthly, 10.0);
        assert!(batch.results[1].notes.starts_with("ERROR:"));
        assert_eq!(batch.results[1].adapter, "A");
        assert_eq!(batch.results[2].monthly, 10.0);
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].resource_id, "r2");
        assert_eq!(batch.errors[0].plugin_name, "A");
    }

    #[tokio::test]
    async fn test_result_count_matches_input_when_everything_fails() {
        let engine = engine(vec![
            FakeSource::new("A", Answer::Fail("down")),
            FakeSource::new("B", Answer::Fail("also down")),
        ])
        .with_config(EngineConfig::default().with_max_concurrency(3));
        let resources: Vec<_> = (0..20).map(|i| queue(&format!("q{i}"))).collect();

        let batch = engine.get_projected_cost(&resources).await.unwrap();
        assert_eq!(batch.results.len(), resources.len());
        assert_eq!(batch.errors.len(), 2 * resources.len());
        for (result, resource) in batch.results.iter().zip(&resources) {
            assert_eq!(result.resource_id, resource.id());
            assert!(result.is_error());
            assert_eq!(result.adapter, "B");
        }
        assert!(batch.error_summary().ends_with("... and 35 more errors"));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let engine = engine(vec![FakeSource::new("A", Answer::Cost(1.0))]);
        let batch = engine.get_projected_cost(&[]).await.unwrap();
        assert!(batch.results.is_empty());
        assert!(!batch.has_errors());
    }

    #[tokio::test]
    async fn test_registration_order_and_fallthrough() {
        let engine = engine(vec![
            FakeSource::new("A", Answer::Fail("boom")),
            FakeSource::new("B", Answer::Cost(20.0)),
            FakeSource::new("C", Answer::Cost(30.0)),
        ]);

        let batch = engine.get_projected_cost(&[queue("q")]).await.unwrap();
        assert_eq!(batch.results[0].adapter, "B");
        assert_eq!(batch.results[0].monthly, 20.0);
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].plugin_name, "A");
    }

    #[tokio::test]
    async fn test_unsupported_is_skipped_without_error() {
        let a = Arc::new(FakeSource::new("A", Answer::Cost(1.0)).unsupported("q"));
        let b: Arc<dyn CostSource> = Arc::new(FakeSource::new("B", Answer::Cost(2.0)));
        let registry = ClientRegistry::with_sources([a.clone() as Arc<dyn CostSource>, b]).unwrap();
        let engine = Engine::new(Arc::new(registry));

        let batch = engine.get_projected_cost(&[queue("q")]).await.unwrap();
        assert_eq!(batch.results[0].adapter, "B");
        assert!(!batch.has_errors());
        assert_eq!(a.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unimplemented_supports_means_supported() {
        let engine = engine(vec![FakeSource::new("legacy", Answer::Cost(3.0)).legacy()]);

        let batch = engine.get_projected_cost(&[queue("q")]).await.unwrap();
        assert_eq!(batch.results[0].adapter, "legacy");
        assert!(!batch.has_errors());
    }

    #[tokio::test]
    async fn test_empty_answer_falls_through_to_spec() {
        let engine = engine(vec![FakeSource::new("A", Answer::Empty)]).with_specs(ec2_specs());

        let batch = engine.get_projected_cost(&[instance("web")]).await.unwrap();
        assert_eq!(batch.results[0].adapter, ADAPTER_LOCAL_SPEC);
        assert!(!batch.has_errors());
    }

    #[tokio::test]
    async fn test_failure_then_spec_keeps_error() {
        let engine = engine(vec![FakeSource::new("A", Answer::Fail("boom"))]).with_specs(ec2_specs());

        let batch = engine.get_projected_cost(&[instance("web")]).await.unwrap();
        assert_eq!(batch.results[0].adapter, ADAPTER_LOCAL_SPEC);
        assert!(!batch.results[0].is_error());
        assert_eq!(batch.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_input_order_preserved_under_concurrency() {
        let engine = engine(vec![
            FakeSource::new("A", Answer::Cost(0.0))
                .on("slow", Answer::Slow(100, 1.0))
                .on("medium", Answer::Slow(50, 2.0))
                .on("fast", Answer::Slow(1, 3.0)),
        ])
        .with_config(EngineConfig::default().with_max_concurrency(3));
        let resources = vec![queue("slow"), queue("medium"), queue("fast")];

        let batch = engine.get_projected_cost(&resources).await.unwrap();
        let ids: Vec<_> = batch.results.iter().map(|r| r.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["slow", "medium", "fast"]);
        let monthly: Vec<_> = batch.results.iter().map(|r| r.monthly).collect();
        assert_eq!(monthly, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_query_deadline() {
        let engine = engine(vec![FakeSource::new("A", Answer::Hang)])
            .with_config(EngineConfig::default().with_query_timeout(Duration::from_millis(50)));

        let err = engine.get_projected_cost(&[queue("q")]).await.unwrap_err();
        assert!(matches!(err, EngineError::DeadlineExceeded(_)));
    }

    // ------------------------------------------------------------------------
    // Actual cost
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_actual_cost_from_plugin() {
        let engine = engine(vec![FakeSource::new("A", Answer::Cost(2.5))]);

        let batch = engine.get_actual_cost(&[queue("q")], january()).await.unwrap();
        let result = &batch.results[0];
        assert_eq!(result.daily_costs, vec![2.5, 2.5, 2.5]);
        assert_eq!(result.start_date, Some(january().start));
        assert_eq!(result.total(), 7.5);
    }

    #[tokio::test]
    async fn test_actual_cost_has_no_spec_fallback() {
        let engine = engine(vec![FakeSource::new("A", Answer::Cost(1.0)).unsupported("web")])
            .with_specs(ec2_specs());

        let batch = engine.get_actual_cost(&[instance("web")], january()).await.unwrap();
        assert_eq!(batch.results[0].adapter, ADAPTER_NONE);
        assert!(batch.results[0].daily_costs.is_empty());
        assert!(!batch.has_errors());
    }

    #[tokio::test]
    async fn test_actual_cost_failure_placeholder() {
        let engine = engine(vec![FakeSource::new("A", Answer::Fail("throttled"))]);

        let batch = engine.get_actual_cost(&[queue("q")], january()).await.unwrap();
        assert!(batch.results[0].is_error());
        assert_eq!(batch.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_actual_cost_rejects_inverted_range() {
        let engine = engine(vec![FakeSource::new("A", Answer::Cost(1.0))]);
        let range = TimeRange {
            start: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };

        let err = engine.get_actual_cost(&[queue("q")], range).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidTimeRange { .. })));
    }

    // ------------------------------------------------------------------------
    // Pricing spec
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_pricing_spec_prefers_plugins() {
        let engine = engine(vec![
            FakeSource::new("A", Answer::Empty),
            FakeSource::new("B", Answer::Cost(12.0)),
        ])
        .with_specs(ec2_specs());

        let spec = engine.get_pricing_spec(&instance("web")).await.unwrap().unwrap();
        assert_eq!(spec.sku, "B");
        assert_eq!(spec.rate_per_unit, Some(12.0));
    }

    #[tokio::test]
    async fn test_pricing_spec_local_fallback() {
        let engine = engine(vec![FakeSource::new("A", Answer::Fail("boom"))]).with_specs(ec2_specs());

        let spec = engine.get_pricing_spec(&instance("web")).await.unwrap().unwrap();
        assert_eq!(spec.sku, "t3.micro");
        assert!(engine.get_pricing_spec(&queue("q")).await.unwrap().is_none());
    }

    // ------------------------------------------------------------------------
    // Launched plugins
    // ------------------------------------------------------------------------

    #[cfg(target_os = "linux")]
    mod launched {
        use super::*;
        use plancost_plugin::{HostSettings, PluginClient, PluginLaunchConfig};
        use tempfile::TempDir;
        use tokio::net::TcpListener;

        fn is_running(pid: u32) -> bool {
            std::fs::read_to_string(format!("/proc/{pid}/stat"))
                .ok()
                .and_then(|stat| {
                    let state = stat.rsplit_once(')')?.1.trim_start().chars().next()?;
                    Some(state != 'Z' && state != 'X')
                })
                .unwrap_or(false)
        }

        #[tokio::test]
        async fn test_deadline_then_drop_reaps_plugin() {
            // Accepts the connection but never answers.
            let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
            let port = listener.local_addr().unwrap().port();
            let tmp = TempDir::new().unwrap();
            let pid_file = tmp.path().join("plugin.pid");
            let config = PluginLaunchConfig::new("mute", "sh").with_args([
                "-c".to_string(),
                format!("echo $$ > '{}'; echo {port}; exec sleep 30", pid_file.display()),
            ]);
            let settings = HostSettings::default()
                .with_handshake_timeout(Duration::from_secs(5))
                .with_probe_timeout(Duration::from_millis(50));

            let client = PluginClient::launch(&config, &settings).await.unwrap();
            let pid: u32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
            assert!(is_running(pid));

            let registry =
                ClientRegistry::with_sources([Arc::new(client) as Arc<dyn CostSource>]).unwrap();
            let engine = Engine::new(Arc::new(registry)).with_config(
                EngineConfig::default().with_query_timeout(Duration::from_millis(200)),
            );

            let err = engine.get_projected_cost(&[instance("web")]).await.unwrap_err();
            assert!(matches!(err, EngineError::DeadlineExceeded(_)));

            drop(engine);
            let gone = async {
                while is_running(pid) {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            };
            tokio::time::timeout(Duration::from_secs(5), gone)
                .await
                .expect("plugin still running after the engine was dropped");
            drop(listener);
        }
    }
}
