//! Text output formatting with colors.

use plancost_core::{AggregatedGroup, CostResult, CrossProviderAggregation, PricingSpec};

use super::{CostReport, PluginRow, PluginStatus, PricingRow, ReportKind};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

const RULE_WIDTH: usize = 78;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats a cost report.
    pub fn format_report(&self, report: &CostReport) -> String {
        let mut lines = Vec::new();
        let currency = report.currency();
        let amount_label = match report.kind {
            ReportKind::Projected => "Monthly",
            ReportKind::Actual => "Total",
        };

        lines.push(format!(
            "{:<24} {:<36} {:<14} {}",
            self.bold("Resource"),
            self.bold("Type"),
            self.bold("Source"),
            self.bold(amount_label)
        ));
        lines.push("─".repeat(RULE_WIDTH));

        for result in &report.batch.results {
            lines.push(self.format_result(result, report.kind));
        }

        lines.push(String::new());
        let total = match &currency {
            Some(currency) => self.green(&format_amount(report.total(), currency)),
            None => self.yellow("mixed currencies"),
        };
        lines.push(format!("{} {}", self.bold(&format!("{amount_label}:")), total));

        if let Some(groups) = &report.groups {
            lines.push(String::new());
            lines.push(self.format_groups(groups));
        }

        if let Some(aggregation) = &report.aggregation {
            lines.push(String::new());
            lines.push(self.format_aggregation(aggregation));
        }

        if let Some(error) = &report.grouping_error {
            lines.push(String::new());
            lines.push(self.red(&format!("Grouping failed: {error}")));
        }

        if report.batch.has_errors() {
            lines.push(String::new());
            lines.push(self.yellow(&report.batch.error_summary()));
        }

        lines.join("\n")
    }

    /// Formats one result row.
    pub fn format_result(&self, result: &CostResult, kind: ReportKind) -> String {
        let amount = if result.is_error() {
            self.red("error")
        } else {
            let value = match kind {
                ReportKind::Projected => result.monthly,
                ReportKind::Actual => result.total(),
            };
            format_amount(value, &result.currency)
        };

        let mut line = format!(
            "{:<24} {:<36} {:<14} {}",
            truncate(&result.resource_id, 24),
            truncate(&result.resource_type, 36),
            result.adapter,
            amount
        );
        if !result.notes.is_empty() {
            line.push_str(&format!("\n{:<24} {}", "", self.dim(&result.notes)));
        }
        line
    }

    /// Formats grouped totals.
    pub fn format_groups(&self, groups: &[AggregatedGroup]) -> String {
        let mut lines = vec![self.bold("Groups")];
        for group in groups {
            lines.push(format!(
                "  {:<36} {:>4}  {}",
                group.key,
                group.count,
                format_amount(group.total, &group.currency)
            ));
        }
        lines.join("\n")
    }

    /// Formats a cross-provider time series.
    pub fn format_aggregation(&self, aggregation: &CrossProviderAggregation) -> String {
        let mut lines = vec![self.bold(&format!("Cost by {} and provider", aggregation.group_by))];

        for bucket in &aggregation.buckets {
            let breakdown: Vec<String> = bucket
                .providers
                .iter()
                .map(|(provider, amount)| format!("{provider} {amount:.2}"))
                .collect();
            lines.push(format!(
                "  {:<12} {:>12}  {}",
                bucket.period,
                format_amount(bucket.total, &aggregation.currency),
                self.dim(&breakdown.join(", "))
            ));
        }

        lines.push(String::new());
        for (provider, total) in &aggregation.provider_totals {
            lines.push(format!(
                "  {:<12} {:>12}",
                self.cyan(provider),
                format_amount(*total, &aggregation.currency)
            ));
        }
        lines.push(format!(
            "  {:<12} {:>12}",
            self.bold("Total"),
            self.green(&format_amount(aggregation.grand_total, &aggregation.currency))
        ));

        lines.join("\n")
    }

    /// Formats pricing spec lookups.
    pub fn format_pricing(&self, rows: &[PricingRow]) -> String {
        let mut lines = Vec::new();
        for row in rows {
            let spec = match &row.spec {
                Some(spec) => self.format_spec(spec),
                None => self.dim("no pricing spec"),
            };
            lines.push(format!("{} ({})\n  {}", self.bold(&row.resource_id), row.resource_type, spec));
        }
        lines.join("\n")
    }

    fn format_spec(&self, spec: &PricingSpec) -> String {
        let rate = match spec.rate_per_unit {
            Some(rate) => format!("{rate} {} {}", spec.currency, spec.billing_mode),
            None => spec.billing_mode.to_string(),
        };
        let mut out = format!("{} {}", self.cyan(&spec.key()), rate);
        if !spec.source.is_empty() {
            out.push_str(&format!(" {}", self.dim(&format!("from {}", spec.source))));
        }
        out
    }

    /// Formats plugin list header.
    pub fn format_plugins_header(&self) -> String {
        format!(
            "{:<20} {:<10} {:<6} {:<10} {}",
            self.bold("Plugin"),
            self.bold("Version"),
            self.bold("Mode"),
            self.bold("Protocol"),
            self.bold("Status")
        )
    }

    /// Formats a single plugin line.
    pub fn format_plugin_line(&self, row: &PluginRow) -> String {
        let (version, protocol, status) = match &row.status {
            PluginStatus::Loaded(meta) => {
                let version = meta
                    .version
                    .as_deref()
                    .or(row.config.version.as_deref())
                    .unwrap_or("−");
                let protocol = meta.spec_version.as_deref().unwrap_or("−").to_string();
                let status = if meta.legacy {
                    self.yellow("✓ legacy")
                } else if !meta.spec_version_compatible {
                    self.yellow("✓ version mismatch")
                } else {
                    self.green("✓")
                };
                (version, protocol, status)
            }
            PluginStatus::Failed(error) => (
                row.config.version.as_deref().unwrap_or("−"),
                "−".to_string(),
                self.red(&format!("✗ {error}")),
            ),
        };

        format!(
            "{:<20} {:<10} {:<6} {:<10} {}",
            row.config.name,
            version,
            row.config.transport.as_str(),
            protocol,
            status
        )
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

/// Two decimal places followed by the currency, if any.
pub fn format_amount(amount: f64, currency: &str) -> String {
    if currency.is_empty() {
        format!("{amount:.2}")
    } else {
        format!("{amount:.2} {currency}")
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

// ============================================================================
// Tests
// ============================================================================
