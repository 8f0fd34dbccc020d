//! CLI output formatting tests.
//!
//! These tests verify that reports render correctly in both text and JSON
//! output modes.

use super::{CostReport, PluginRow, PluginStatus, PricingRow, ReportKind};
use plancost_core::{
    BillingMode, CostResult, CostResultWithErrors, ErrorDetail, PricingSpec, ResourceDescriptor,
};
use plancost_plugin::{PluginLaunchConfig, PluginMetadata, TransportMode};

fn batch() -> CostResultWithErrors {
    let web = ResourceDescriptor::new("web", "aws:ec2/instance:Instance");
    let db = ResourceDescriptor::new("db", "aws:rds/instance:Instance");
    CostResultWithErrors {
        results: vec![
            CostResult::new(&web, "aws-public")
                .with_currency("USD")
                .with_monthly(7.5),
            CostResult::error_placeholder(&db, "aws-public", "connection reset"),
        ],
        errors: vec![ErrorDetail::new(&db, "aws-public", "connection reset")],
    }
}

fn metadata(name: &str) -> PluginMetadata {
    PluginMetadata {
        name: name.to_string(),
        version: Some("1.4.0".to_string()),
        spec_version: Some("1.2.0".to_string()),
        spec_version_compatible: true,
        legacy: false,
        info_probe_failed: false,
        providers: vec!["aws".to_string()],
    }
}

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::TextFormatter;
    use super::*;

    #[test]
    fn test_report_lists_every_result() {
        let formatter = TextFormatter::new(false);
        let report = CostReport::new(ReportKind::Projected, batch());

        let output = formatter.format_report(&report);
        assert!(output.contains("web"));
        assert!(output.contains("7.50 USD"));
        assert!(output.contains("db"));
        assert!(output.contains("ERROR: connection reset"));
        assert!(output.contains("Monthly: 7.50 USD"));
        assert!(output.contains("1 error(s) occurred"));
    }

    #[test]
    fn test_mixed_currency_total() {
        let formatter = TextFormatter::new(false);
        let r = ResourceDescriptor::new("a", "aws:x");
        let batch = CostResultWithErrors {
            results: vec![
                CostResult::new(&r, "p").with_currency("USD").with_monthly(1.0),
                CostResult::new(&r, "p").with_currency("EUR").with_monthly(1.0),
            ],
            errors: Vec::new(),
        };

        let output = formatter.format_report(&CostReport::new(ReportKind::Projected, batch));
        assert!(output.contains("mixed currencies"));
    }

    #[test]
    fn test_actual_report_uses_totals() {
        let formatter = TextFormatter::new(false);
        let r = ResourceDescriptor::new("a", "gcp:compute/instance:Instance");
        let batch = CostResultWithErrors {
            results: vec![
                CostResult::new(&r, "gcp")
                    .with_currency("USD")
                    .with_daily_costs(vec![1.0, 2.0]),
            ],
            errors: Vec::new(),
        };

        let output = formatter.format_report(&CostReport::new(ReportKind::Actual, batch));
        assert!(output.contains("Total: 3.00 USD"));
    }

    #[test]
    fn test_plugin_lines() {
        let formatter = TextFormatter::new(false);
        let config = PluginLaunchConfig::new("aws-public", "/plugins/aws-public/1.4.0/aws-public")
            .with_version("1.4.0")
            .with_transport(TransportMode::Stdio);

        let loaded = PluginRow {
            config: config.clone(),
            status: PluginStatus::Loaded(metadata("aws-public")),
        };
        let line = formatter.format_plugin_line(&loaded);
        assert!(line.starts_with("aws-public"));
        assert!(line.contains("stdio"));
        assert!(line.contains("1.2.0"));
        assert!(line.contains('✓'));

        let mut skewed = metadata("aws-public");
        skewed.spec_version_compatible = false;
        let line = formatter.format_plugin_line(&PluginRow {
            config: config.clone(),
            status: PluginStatus::Loaded(skewed),
        });
        assert!(line.contains("version mismatch"));

        let failed = PluginRow {
            config,
            status: PluginStatus::Failed("handshake timed out".to_string()),
        };
        assert!(formatter.format_plugin_line(&failed).contains("✗ handshake timed out"));
    }

    #[test]
    fn test_pricing_rows() {
        let formatter = TextFormatter::new(false);
        let rows = vec![
            PricingRow {
                resource_id: "web".to_string(),
                resource_type: "aws:ec2/instance:Instance".to_string(),
                spec: Some(
                    PricingSpec::new("aws", "ec2", "t3.micro").with_rate(0.0104, BillingMode::PerHour),
                ),
            },
            PricingRow {
                resource_id: "q".to_string(),
                resource_type: "gcp:pubsub/topic:Topic".to_string(),
                spec: None,
            },
        ];

        let output = formatter.format_pricing(&rows);
        assert!(output.contains("aws/ec2/t3.micro 0.0104 USD per_hour"));
        assert!(output.contains("no pricing spec"));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::JsonFormatter;
    use super::*;
    use plancost_core::GroupBy;
    use plancost_engine::group_results;

    #[test]
    fn test_report_json_shape() {
        let formatter = JsonFormatter::new(false);
        let mut report = CostReport::new(ReportKind::Projected, batch());
        report.groups = Some(group_results(&report.batch.results, GroupBy::Provider).unwrap());

        let output = formatter.format_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["kind"], "projected");
        assert_eq!(value["currency"], "USD");
        assert_eq!(value["total"], 7.5);
        assert_eq!(value["results"].as_array().unwrap().len(), 2);
        assert_eq!(value["results"][0]["resourceId"], "web");
        assert_eq!(value["errors"][0]["pluginName"], "aws-public");
        assert_eq!(value["groups"][0]["key"], "aws");
        assert!(value.get("aggregation").is_none());
    }

    #[test]
    fn test_plugins_json() {
        let formatter = JsonFormatter::new(false);
        let config = PluginLaunchConfig::new("aws-public", "/plugins/aws-public");
        let rows = vec![
            PluginRow {
                config: config.clone(),
                status: PluginStatus::Loaded(metadata("aws-public")),
            },
            PluginRow {
                config,
                status: PluginStatus::Failed("boom".to_string()),
            },
        ];

        let output = formatter.format_plugins(&rows).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["loaded"], true);
        assert_eq!(value[0]["version"], "1.4.0");
        assert_eq!(value[0]["specVersion"], "1.2.0");
        assert_eq!(value[0]["transport"], "tcp");
        assert_eq!(value[1]["loaded"], false);
        assert_eq!(value[1]["error"], "boom");
    }

    #[test]
    fn test_pricing_json() {
        let formatter = JsonFormatter::new(false);
        let rows = vec![PricingRow {
            resource_id: "q".to_string(),
            resource_type: "gcp:pubsub/topic:Topic".to_string(),
            spec: None,
        }];

        let output = formatter.format_pricing(&rows).unwrap();
        assert_eq!(
            output,
            r#"[{"resourceId":"q","resourceType":"gcp:pubsub/topic:Topic","spec":null}]"#
        );
    }
}

#[cfg(test)]
mod grouping_tests {
    use super::super::{JsonFormatter, TextFormatter};
    use super::*;
    use plancost_core::GroupBy;

    fn undated() -> CostResultWithErrors {
        let q = ResourceDescriptor::new("queue", "gcp:pubsub/topic:Topic");
        CostResultWithErrors {
            results: vec![CostResult::new(&q, "none")],
            errors: Vec::new(),
        }
    }

    #[test]
    fn test_flat_grouping() {
        let mut report = CostReport::new(ReportKind::Projected, batch());
        report.group(GroupBy::Provider);

        assert_eq!(report.groups.as_ref().unwrap()[0].key, "aws");
        assert!(report.aggregation.is_none());
        assert!(report.grouping_error.is_none());
    }

    #[test]
    fn test_undated_time_series_keeps_results() {
        let mut report = CostReport::new(ReportKind::Actual, undated());
        report.group(GroupBy::Daily);

        assert!(report.aggregation.is_none());
        assert!(report.grouping_error.is_some());
        assert!(report.is_partial());

        let text = TextFormatter::new(false).format_report(&report);
        assert!(text.contains("queue"));
        assert!(text.contains("Grouping failed:"));

        let json = JsonFormatter::new(false).format_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["results"].as_array().unwrap().len(), 1);
        assert!(value["groupingError"].is_string());
    }

    #[test]
    fn test_clean_report_is_not_partial() {
        let mut report = CostReport::new(ReportKind::Projected, undated());
        report.group(GroupBy::Resource);

        assert!(!report.is_partial());
        assert!(!CostReport::new(ReportKind::Projected, undated()).is_partial());
        assert!(CostReport::new(ReportKind::Projected, batch()).is_partial());
    }
}
