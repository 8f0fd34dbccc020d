//! Domain models for plancost.
//!
//! ## Submodules
//!
//! - [`resource`] - Resource descriptors from infrastructure plans
//! - [`cost`] - Cost results, error details, and result batches
//! - [`pricing`] - Static pricing specifications
//! - [`aggregation`] - Grouping dimensions and time-series summaries

pub mod aggregation;
pub mod cost;
pub mod pricing;
pub mod resource;

// Re-export everything at the models level
pub use aggregation::{AggregatedGroup, CrossProviderAggregation, GroupBy, TimeBucket, TimeRange};
pub use cost::{
    ADAPTER_LOCAL_SPEC, ADAPTER_NONE, CostResult, CostResultWithErrors, DEFAULT_CURRENCY,
    ERROR_NOTE_PREFIX, ErrorDetail, HOURS_PER_MONTH, MAX_SUMMARY_ENTRIES, UNKNOWN_PLUGIN,
};
pub use pricing::{BillingMode, PricingSpec};
pub use resource::{ResourceDescriptor, UNKNOWN_PROVIDER, provider_from_type};
#[cfg(test)]
mod serde_tests;
