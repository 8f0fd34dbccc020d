//! JSON output formatting.

use anyhow::Result;
use serde::Serialize;

use plancost_core::{
    AggregatedGroup, CostResult, CrossProviderAggregation, ErrorDetail, PricingSpec,
};

use super::{CostReport, PluginRow, PluginStatus, PricingRow, ReportKind};

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for a cost query.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutput<'a> {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub total: f64,
    pub results: &'a [CostResult],
    pub errors: &'a [ErrorDetail],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<&'a [AggregatedGroup]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<&'a CrossProviderAggregation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping_error: Option<&'a str>,
}

/// JSON output for one pricing spec lookup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingOutput<'a> {
    pub resource_id: &'a str,
    pub resource_type: &'a str,
    pub spec: Option<&'a PricingSpec>,
}

/// JSON output for an installed plugin.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginOutput<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'a str>,
    pub path: String,
    pub transport: &'static str,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatible: Option<bool>,
    pub legacy: bool,
    pub providers: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a cost report.
    pub fn format_report(&self, report: &CostReport) -> Result<String> {
        self.format(&Self::report_to_output(report))
    }

    fn report_to_output(report: &CostReport) -> ReportOutput<'_> {
        ReportOutput {
            kind: match report.kind {
                ReportKind::Projected => "projected",
                ReportKind::Actual => "actual",
            },
            currency: report.currency(),
            total: report.total(),
            results: &report.batch.results,
            errors: &report.batch.errors,
            groups: report.groups.as_deref(),
            aggregation: report.aggregation.as_ref(),
            grouping_error: report.grouping_error.as_deref(),
        }
    }

    /// Formats pricing spec lookups.
    pub fn format_pricing(&self, rows: &[PricingRow]) -> Result<String> {
        let outputs: Vec<PricingOutput<'_>> = rows
            .iter()
            .map(|row| PricingOutput {
                resource_id: &row.resource_id,
                resource_type: &row.resource_type,
                spec: row.spec.as_ref(),
            })
            .collect();
        self.format(&outputs)
    }

    /// Formats the plugin list.
    pub fn format_plugins(&self, rows: &[PluginRow]) -> Result<String> {
        let outputs: Vec<PluginOutput<'_>> = rows.iter().map(Self::plugin_to_output).collect();
        self.format(&outputs)
    }

    fn plugin_to_output(row: &PluginRow) -> PluginOutput<'_> {
        let mut output = PluginOutput {
            name: &row.config.name,
            version: row.config.version.as_deref(),
            path: row.config.path.display().to_string(),
            transport: row.config.transport.as_str(),
            loaded: false,
            spec_version: None,
            compatible: None,
            legacy: false,
            providers: &[],
            error: None,
        };

        match &row.status {
            PluginStatus::Loaded(meta) => {
                output.loaded = true;
                output.version = meta.version.as_deref().or(output.version);
                output.spec_version = meta.spec_version.as_deref();
                output.compatible = Some(meta.spec_version_compatible);
                output.legacy = meta.legacy;
                output.providers = &meta.providers;
            }
            PluginStatus::Failed(error) => output.error = Some(error.as_str()),
        }
        output
    }
}

// ============================================================================
// Tests
// ============================================================================
