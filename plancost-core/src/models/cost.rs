//! Cost result types.
//!
//! This module contains the engine's output types:
//! - [`CostResult`] - One resource's computed estimate
//! - [`ErrorDetail`] - One failed resource/plugin interaction
//! - [`CostResultWithErrors`] - A batch of results plus its failures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Write as _};

use super::resource::{ResourceDescriptor, provider_from_type};

/// Fixed conversion between hourly and monthly rates.
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Adapter name for results computed from bundled pricing specs.
pub const ADAPTER_LOCAL_SPEC: &str = "local-spec";

/// Adapter name for results no source could price.
pub const ADAPTER_NONE: &str = "none";

/// Plugin name recorded when an error cannot be attributed.
pub const UNKNOWN_PLUGIN: &str = "unknown";

/// Currency assumed when no result carries one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Prefix marking a placeholder result for a failed resource.
pub const ERROR_NOTE_PREFIX: &str = "ERROR:";

/// Maximum number of explicit entries in [`CostResultWithErrors::error_summary`].
pub const MAX_SUMMARY_ENTRIES: usize = 5;

// ============================================================================
// Cost Result
// ============================================================================

/// One resource's computed cost estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostResult {
    /// Resource type the estimate is for.
    pub resource_type: String,
    /// Resource id the estimate is for.
    pub resource_id: String,
    /// Plugin name, `local-spec`, or `none`.
    pub adapter: String,
    /// ISO currency code. Empty for zero-value placeholders.
    #[serde(default)]
    pub currency: String,
    /// Monthly cost.
    #[serde(default)]
    pub monthly: f64,
    /// Hourly cost.
    #[serde(default)]
    pub hourly: f64,
    /// Per-day amounts for actual-cost queries, starting at `start_date`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub daily_costs: Vec<f64>,
    /// Start of the period the result covers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    /// End of the period the result covers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Free-text notes. Failed resources carry an `ERROR:` prefix.
    #[serde(default)]
    pub notes: String,
}

impl CostResult {
    /// Creates an empty result for a resource, attributed to `adapter`.
    pub fn new(resource: &ResourceDescriptor, adapter: impl Into<String>) -> Self {
        Self {
            resource_type: resource.resource_type().to_string(),
            resource_id: resource.id().to_string(),
            adapter: adapter.into(),
            currency: String::new(),
            monthly: 0.0,
            hourly: 0.0,
            daily_costs: Vec::new(),
            start_date: None,
            end_date: None,
            notes: String::new(),
        }
    }

    /// Zero-cost result for a resource nothing could price.
    pub fn none(resource: &ResourceDescriptor) -> Self {
        Self::new(resource, ADAPTER_NONE).with_notes("No pricing information available")
    }

    /// Zero-value placeholder for a resource whose lookup failed.
    pub fn error_placeholder(
        resource: &ResourceDescriptor,
        plugin: &str,
        message: impl Display,
    ) -> Self {
        let adapter = if plugin.is_empty() { UNKNOWN_PLUGIN } else { plugin };
        Self::new(resource, adapter).with_notes(format!("{ERROR_NOTE_PREFIX} {message}"))
    }

    /// Sets the currency.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Sets the monthly cost and derives the hourly cost.
    pub fn with_monthly(mut self, monthly: f64) -> Self {
        self.monthly = monthly;
        self.hourly = monthly / HOURS_PER_MONTH;
        self
    }

    /// Sets the hourly cost and derives the monthly cost.
    pub fn with_hourly(mut self, hourly: f64) -> Self {
        self.hourly = hourly;
        self.monthly = hourly * HOURS_PER_MONTH;
        self
    }

    /// Sets the per-day amounts.
    pub fn with_daily_costs(mut self, daily: Vec<f64>) -> Self {
        self.daily_costs = daily;
        self
    }

    /// Sets the covered period.
    pub fn with_period(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    /// Sets the notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Returns true if this is a placeholder for a failed resource.
    pub fn is_error(&self) -> bool {
        self.notes.starts_with(ERROR_NOTE_PREFIX)
    }

    /// Provider prefix of the resource type.
    pub fn provider(&self) -> &str {
        provider_from_type(&self.resource_type)
    }

    /// Total amount: the sum of daily costs when present, else the monthly cost.
    pub fn total(&self) -> f64 {
        if self.daily_costs.is_empty() {
            self.monthly
        } else {
            self.daily_costs.iter().sum()
        }
    }
}

// ============================================================================
// Error Detail
// ============================================================================

/// One failed resource/plugin interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    /// Resource type that failed.
    pub resource_type: String,
    /// Resource id that failed.
    pub resource_id: String,
    /// Plugin that produced the error, or `unknown`.
    pub plugin_name: String,
    /// Rendered error message.
    pub error: String,
    /// When the error was captured.
    pub timestamp: DateTime<Utc>,
}

impl ErrorDetail {
    /// Captures an error for a resource.
    pub fn new(resource: &ResourceDescriptor, plugin_name: &str, error: impl Display) -> Self {
        let plugin_name = if plugin_name.is_empty() {
            UNKNOWN_PLUGIN
        } else {
            plugin_name
        };

        Self {
            resource_type: resource.resource_type().to_string(),
            resource_id: resource.id().to_string(),
            plugin_name: plugin_name.to_string(),
            error: error.to_string(),
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) via {}: {}",
            self.resource_type, self.resource_id, self.plugin_name, self.error
        )
    }
}

// ============================================================================
// Cost Result With Errors
// ============================================================================

/// A batch of cost results together with the errors encountered.
///
/// `results` holds exactly one entry per input resource, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostResultWithErrors {
    /// One result per input resource.
    pub results: Vec<CostResult>,
    /// Errors, in completion order.
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

impl CostResultWithErrors {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if any error was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Sum of monthly costs across all results.
    pub fn total_monthly(&self) -> f64 {
        self.results.iter().map(|r| r.monthly).sum()
    }

    /// Human-readable error summary.
    ///
    /// Lists at most [`MAX_SUMMARY_ENTRIES`] errors followed by a remainder
    /// count. Returns an empty string when there are no errors.
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }

        let mut out = format!("{} error(s) occurred:", self.errors.len());
        for detail in self.errors.iter().take(MAX_SUMMARY_ENTRIES) {
            let _ = write!(out, "\n- {detail}");
        }

        let remaining = self.errors.len().saturating_sub(MAX_SUMMARY_ENTRIES);
        if remaining > 0 {
            let _ = write!(out, "\n... and {remaining} more errors");
        }

        out
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(id, "aws:ec2/instance:Instance")
    }

    fn batch_with_errors(n: usize) -> CostResultWithErrors {
        let mut batch = CostResultWithErrors::new();
        for i in 0..n {
            let r = resource(&format!("r{i}"));
            batch.results.push(CostResult::error_placeholder(&r, "aws", "boom"));
            batch.errors.push(ErrorDetail::new(&r, "aws", "boom"));
        }
        batch
    }

    #[test]
    fn test_monthly_hourly_conversion() {
        let r = CostResult::new(&resource("a"), "aws").with_hourly(0.01);
        assert!((r.monthly - 7.3).abs() < 1e-9);

        let r = CostResult::new(&resource("a"), "aws").with_monthly(73.0);
        assert!((r.hourly - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_error_placeholder() {
        let r = CostResult::error_placeholder(&resource("a"), "", "timed out");
        assert!(r.is_error());
        assert!(r.notes.starts_with("ERROR:"));
        assert_eq!(r.adapter, UNKNOWN_PLUGIN);
        assert_eq!(r.monthly, 0.0);
    }

    #[test]
    fn test_none_result() {
        let r = CostResult::none(&resource("a"));
        assert_eq!(r.adapter, ADAPTER_NONE);
        assert!(!r.is_error());
        assert_eq!(r.total(), 0.0);
    }

    #[test]
    fn test_total_prefers_daily_costs() {
        let r = CostResult::new(&resource("a"), "aws")
            .with_monthly(100.0)
            .with_daily_costs(vec![1.0, 2.0, 3.0]);
        assert_eq!(r.total(), 6.0);
    }

    #[test]
    fn test_error_detail_defaults_plugin_name() {
        let d = ErrorDetail::new(&resource("a"), "", "failure");
        assert_eq!(d.plugin_name, UNKNOWN_PLUGIN);
        assert_eq!(d.error, "failure");
    }

    #[test]
    fn test_has_errors() {
        assert!(!CostResultWithErrors::new().has_errors());
        assert!(batch_with_errors(1).has_errors());
    }

    #[test]
    fn test_error_summary_empty() {
        assert_eq!(CostResultWithErrors::new().error_summary(), "");
    }

    #[test]
    fn test_error_summary_under_limit() {
        let summary = batch_with_errors(3).error_summary();
        assert_eq!(summary.lines().filter(|l| l.starts_with("- ")).count(), 3);
        assert!(!summary.contains("more errors"));
    }

    #[test]
    fn test_error_summary_caps_entries() {
        let summary = batch_with_errors(8).error_summary();
        assert_eq!(summary.lines().filter(|l| l.starts_with("- ")).count(), 5);
        assert!(summary.ends_with("... and 3 more errors"));
    }

    #[test]
    fn test_error_summary_exactly_limit() {
        let summary = batch_with_errors(5).error_summary();
        assert_eq!(summary.lines().filter(|l| l.starts_with("- ")).count(), 5);
        assert!(!summary.contains("more errors"));
    }
}
