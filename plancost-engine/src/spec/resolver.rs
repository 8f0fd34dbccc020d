//! Estimates from local pricing specs.
//!
//! Once a spec matches a resource, three heuristics are tried in order:
//!
//! 1. **Direct**: `pricing.monthly_estimate`, `pricing.on_demand_hourly`, or
//!    an hourly/monthly `rate_per_unit`
//! 2. **Storage**: resource size times a per-GB-month price
//! 3. **Type default**: a fixed monthly figure for the resource's category

use std::fmt;
use tracing::debug;

use plancost_core::{ADAPTER_LOCAL_SPEC, BillingMode, CostResult, PricingSpec, ResourceDescriptor};

use super::loader::SpecStore;

/// Properties holding a storage size in GB, in priority order.
pub const SIZE_KEYS: &[&str] = &["size", "sizeGb", "allocatedStorage", "volumeSize", "diskSizeGb"];

/// Monthly defaults by resource category. First matching keyword wins.
const TYPE_DEFAULTS: &[(&str, &[&str], f64)] = &[
    ("database", &["database", "rds", "sql"], 50.0),
    ("cache", &["cache", "redis", "memcache"], 25.0),
    ("function", &["function", "lambda"], 1.0),
    ("load balancer", &["loadbalancer"], 18.0),
    ("volume", &["volume", "disk", "ebs"], 10.0),
    ("storage", &["bucket", "storage", "s3", "blob"], 5.0),
    ("compute", &["instance", "vm", "compute"], 30.0),
];

// ============================================================================
// Heuristic
// ============================================================================

/// Which heuristic produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    /// A price read straight from the spec.
    Direct,
    /// Size times a per-GB price.
    Storage,
    /// Category default.
    TypeDefault,
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Direct => "direct",
            Self::Storage => "storage",
            Self::TypeDefault => "type-default",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Local Spec Resolver
// ============================================================================

/// Prices resources from a [`SpecStore`].
#[derive(Debug, Clone, Default)]
pub struct LocalSpecResolver {
    store: SpecStore,
}

impl LocalSpecResolver {
    /// Creates a resolver over a store.
    pub fn new(store: SpecStore) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &SpecStore {
        &self.store
    }

    /// Returns the matching spec for a resource.
    pub fn pricing_spec(&self, resource: &ResourceDescriptor) -> Option<&PricingSpec> {
        self.store.lookup(resource)
    }

    /// Estimates a resource's cost, or `None` when no spec matches.
    pub fn estimate(&self, resource: &ResourceDescriptor) -> Option<CostResult> {
        let spec = self.store.lookup(resource)?;
        let result = CostResult::new(resource, ADAPTER_LOCAL_SPEC).with_currency(&spec.currency);

        let (result, heuristic, detail) = if let Some((rate, detail)) = direct(spec) {
            (rate.apply(result), Heuristic::Direct, detail)
        } else if let Some((monthly, detail)) = storage(spec, resource) {
            (result.with_monthly(monthly), Heuristic::Storage, detail)
        } else if let Some((monthly, category)) = type_default(resource.resource_type()) {
            (
                result.with_monthly(monthly),
                Heuristic::TypeDefault,
                format!("default for {category} resources"),
            )
        } else {
            debug!(resource = %resource.id(), spec = %spec.key(), "Spec matched but has no usable price");
            return None;
        };

        debug!(resource = %resource.id(), %heuristic, monthly = result.monthly, "Local spec estimate");
        Some(result.with_notes(format!("{heuristic} estimate ({detail}) from {}", spec.key())))
    }
}

enum Rate {
    Monthly(f64),
    Hourly(f64),
}

impl Rate {
    fn apply(self, result: CostResult) -> CostResult {
        match self {
            Self::Monthly(monthly) => result.with_monthly(monthly),
            Self::Hourly(hourly) => result.with_hourly(hourly),
        }
    }
}

fn direct(spec: &PricingSpec) -> Option<(Rate, String)> {
    if let Some(monthly) = spec.price("monthly_estimate") {
        return Some((Rate::Monthly(monthly), "monthly_estimate".to_string()));
    }
    if let Some(hourly) = spec.price("on_demand_hourly") {
        return Some((Rate::Hourly(hourly), "on_demand_hourly".to_string()));
    }
    let rate = spec.rate_per_unit?;
    match spec.billing_mode {
        BillingMode::PerHour => Some((Rate::Hourly(rate), format!("{rate}/hour"))),
        BillingMode::PerMonth | BillingMode::Flat => {
            Some((Rate::Monthly(rate), format!("{rate}/month")))
        }
        _ => None,
    }
}

fn storage(spec: &PricingSpec, resource: &ResourceDescriptor) -> Option<(f64, String)> {
    let size = resource.first_f64(SIZE_KEYS)?;
    let price = spec.price("price_per_gb_month").or(match spec.billing_mode {
        BillingMode::PerGbMonth => spec.rate_per_unit,
        _ => None,
    })?;
    Some((size * price, format!("{size} GB at {price}/GB-month")))
}

/// Category default for a resource type, matched by keyword.
pub fn type_default(resource_type: &str) -> Option<(f64, &'static str)> {
    let lowered = resource_type.to_ascii_lowercase();
    TYPE_DEFAULTS
        .iter()
        .find(|(_, keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(category, _, monthly)| (*monthly, *category))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(specs: Vec<PricingSpec>) -> LocalSpecResolver {
        LocalSpecResolver::new(SpecStore::with_specs(specs))
    }

    #[test]
    fn test_direct_hourly_rate() {
        let r = resolver(vec![
            PricingSpec::new("aws", "ec2", "t3.micro").with_rate(0.0104, BillingMode::PerHour),
        ]);
        let resource = ResourceDescriptor::new("web", "aws:ec2/instance:Instance")
            .with_property("instanceType", "t3.micro");

        let result = r.estimate(&resource).unwrap();
        assert_eq!(result.adapter, ADAPTER_LOCAL_SPEC);
        assert_eq!(result.currency, "USD");
        assert!((result.monthly - 7.592).abs() < 1e-9);
        assert!(result.notes.starts_with("direct estimate"));
    }

    #[test]
    fn test_monthly_estimate_beats_rate() {
        let r = resolver(vec![
            PricingSpec::new("aws", "ec2", "t3.micro")
                .with_rate(0.0104, BillingMode::PerHour)
                .with_price("monthly_estimate", 8.0),
        ]);
        let resource = ResourceDescriptor::new("web", "aws:ec2/instance:Instance")
            .with_property("instanceType", "t3.micro");

        assert_eq!(r.estimate(&resource).unwrap().monthly, 8.0);
    }

    #[test]
    fn test_storage_pricing() {
        let r = resolver(vec![
            PricingSpec::new("aws", "ebs", "gp3").with_rate(0.08, BillingMode::PerGbMonth),
        ]);
        let resource = ResourceDescriptor::new("data", "aws:ebs/volume:Volume")
            .with_property("type", "gp3")
            .with_property("size", 100);

        let result = r.estimate(&resource).unwrap();
        assert!((result.monthly - 8.0).abs() < 1e-9);
        assert!(result.notes.starts_with("storage estimate"));
    }

    #[test]
    fn test_storage_needs_size() {
        let r = resolver(vec![
            PricingSpec::new("aws", "ebs", "gp3").with_rate(0.08, BillingMode::PerGbMonth),
        ]);
        let resource =
            ResourceDescriptor::new("data", "aws:ebs/volume:Volume").with_property("type", "gp3");

        // Falls through to the volume category default.
        let result = r.estimate(&resource).unwrap();
        assert_eq!(result.monthly, 10.0);
        assert!(result.notes.starts_with("type-default estimate"));
    }

    #[test]
    fn test_type_default_keywords() {
        assert_eq!(type_default("aws:rds/instance:Instance"), Some((50.0, "database")));
        assert_eq!(type_default("aws:ec2/instance:Instance"), Some((30.0, "compute")));
        assert_eq!(type_default("azure-native:compute:Disk"), Some((10.0, "volume")));
        assert_eq!(type_default("aws:s3/bucket:Bucket"), Some((5.0, "storage")));
        assert_eq!(type_default("aws:lb/loadBalancer:LoadBalancer"), Some((18.0, "load balancer")));
        assert_eq!(type_default("aws:lambda/function:Function"), Some((1.0, "function")));
        assert_eq!(type_default("gcp:pubsub/topic:Topic"), None);
    }

    #[test]
    fn test_no_spec_no_estimate() {
        let r = resolver(Vec::new());
        let resource = ResourceDescriptor::new("db", "aws:rds/instance:Instance");
        assert!(r.estimate(&resource).is_none());
    }
}
