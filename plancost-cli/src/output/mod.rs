//! Output formatting for CLI.

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;
#[cfg(test)]
mod tests;

use plancost_core::{
    AggregatedGroup, CostResult, CostResultWithErrors, CrossProviderAggregation, GroupBy,
    PricingSpec,
};
use plancost_engine::{common_currency, create_cross_provider_aggregation, group_results};
use tracing::warn;
use plancost_plugin::{PluginLaunchConfig, PluginMetadata};

// ============================================================================
// Report Types
// ============================================================================

/// Which query produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Projected monthly cost.
    Projected,
    /// Actual historical cost.
    Actual,
}

/// A cost query result ready for display.
#[derive(Debug)]
pub struct CostReport {
    /// Query kind.
    pub kind: ReportKind,
    /// Per-resource results and errors.
    pub batch: CostResultWithErrors,
    /// Optional grouping.
    pub groups: Option<Vec<AggregatedGroup>>,
    /// Optional time series.
    pub aggregation: Option<CrossProviderAggregation>,
    /// Why the requested grouping could not be built.
    pub grouping_error: Option<String>,
}

impl CostReport {
    /// Creates a report without grouping.
    pub fn new(kind: ReportKind, batch: CostResultWithErrors) -> Self {
        Self {
            kind,
            batch,
            groups: None,
            aggregation: None,
            grouping_error: None,
        }
    }

    /// Summarizes the results along `group_by`.
    ///
    /// Actual reports grouped by day or month get a cross-provider time
    /// series; everything else gets flat groups. A failure is recorded in
    /// [`grouping_error`](Self::grouping_error) and the results stay intact.
    pub fn group(&mut self, group_by: GroupBy) {
        let failure = if self.kind == ReportKind::Actual && group_by.is_time_based() {
            match create_cross_provider_aggregation(&self.batch.results, group_by) {
                Ok(aggregation) => {
                    self.aggregation = Some(aggregation);
                    None
                }
                Err(e) => Some(e),
            }
        } else {
            match group_results(&self.batch.results, group_by) {
                Ok(groups) => {
                    self.groups = Some(groups);
                    None
                }
                Err(e) => Some(e),
            }
        };

        if let Some(e) = failure {
            warn!(group_by = %group_by, error = %e, "Grouping failed");
            self.grouping_error = Some(e.to_string());
        }
    }

    /// True when some resource failed or the grouping could not be built.
    pub fn is_partial(&self) -> bool {
        self.batch.has_errors() || self.grouping_error.is_some()
    }

    /// Shared currency, or `None` when results disagree.
    pub fn currency(&self) -> Option<String> {
        common_currency(&self.batch.results).ok()
    }

    /// Sum over all results: monthly cost for projected reports, the full
    /// period total for actual ones.
    pub fn total(&self) -> f64 {
        match self.kind {
            ReportKind::Projected => self.batch.total_monthly(),
            ReportKind::Actual => self.batch.results.iter().map(CostResult::total).sum(),
        }
    }
}

/// One resource's pricing spec lookup.
#[derive(Debug)]
pub struct PricingRow {
    /// Resource id.
    pub resource_id: String,
    /// Resource type.
    pub resource_type: String,
    /// Matching spec, if any.
    pub spec: Option<PricingSpec>,
}

/// Load outcome of an installed plugin.
#[derive(Debug)]
pub enum PluginStatus {
    /// Started and answered the metadata calls.
    Loaded(PluginMetadata),
    /// Failed to start.
    Failed(String),
}

/// One installed plugin.
#[derive(Debug)]
pub struct PluginRow {
    /// Discovery entry.
    pub config: PluginLaunchConfig,
    /// Load outcome.
    pub status: PluginStatus,
}
