// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # plancost Core
//!
//! Core types and models shared by every plancost crate.
//!
//! ## Key Types
//!
//! ### Inputs
//! - [`ResourceDescriptor`] - A resource from an infrastructure plan
//! - [`TimeRange`] - Window for actual-cost queries
//!
//! ### Results
//! - [`CostResult`] - One resource's estimate
//! - [`ErrorDetail`] - One failed resource/plugin interaction
//! - [`CostResultWithErrors`] - A batch of results plus its failures
//!
//! ### Pricing
//! - [`PricingSpec`] - Static list price for one SKU
//!
//! ### Aggregation
//! - [`GroupBy`] - Summary dimension
//! - [`AggregatedGroup`] - Grouped totals
//! - [`CrossProviderAggregation`] - Time-bucketed, per-provider totals

pub mod error;
pub mod models;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Inputs
    ResourceDescriptor,
    TimeRange,
    UNKNOWN_PROVIDER,
    provider_from_type,
    // Results
    ADAPTER_LOCAL_SPEC,
    ADAPTER_NONE,
    CostResult,
    CostResultWithErrors,
    DEFAULT_CURRENCY,
    ERROR_NOTE_PREFIX,
    ErrorDetail,
    HOURS_PER_MONTH,
    MAX_SUMMARY_ENTRIES,
    UNKNOWN_PLUGIN,
    // Pricing
    BillingMode,
    PricingSpec,
    // Aggregation
    AggregatedGroup,
    CrossProviderAggregation,
    GroupBy,
    TimeBucket,
};
