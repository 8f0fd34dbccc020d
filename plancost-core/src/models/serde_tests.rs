//! Serde wire-shape tests for core types.
//!
//! These types cross the plugin boundary as JSON, so the field names and
//! omission rules matter as much as the values.

use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::{
    CostResult, CostResultWithErrors, ErrorDetail, GroupBy, PricingSpec, ResourceDescriptor,
};

fn web_server() -> ResourceDescriptor {
    ResourceDescriptor::new("web", "aws:ec2/instance:Instance")
        .with_property("instanceType", "t3.micro")
}

// ============================================================================
// CostResult
// ============================================================================

#[test]
fn test_cost_result_uses_camel_case() {
    let result = CostResult::new(&web_server(), "aws-public")
        .with_currency("USD")
        .with_monthly(7.3);
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["resourceType"], "aws:ec2/instance:Instance");
    assert_eq!(value["resourceId"], "web");
    assert_eq!(value["adapter"], "aws-public");
    assert!(value.get("dailyCosts").is_none(), "empty daily costs are omitted");
    assert!(value.get("startDate").is_none());
}

#[test]
fn test_cost_result_accepts_sparse_plugin_payload() {
    let payload = json!({
        "resourceType": "aws:s3/bucket:Bucket",
        "resourceId": "logs",
        "adapter": "aws-ce",
        "currency": "USD",
        "dailyCosts": [0.5, 0.25],
        "startDate": "2024-03-01T00:00:00Z",
        "endDate": "2024-03-02T00:00:00Z"
    });

    let result: CostResult = serde_json::from_value(payload).unwrap();
    assert_eq!(result.monthly, 0.0);
    assert_eq!(result.daily_costs, vec![0.5, 0.25]);
    assert_eq!(
        result.start_date,
        Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
    );
    assert!(result.notes.is_empty());
}

// ============================================================================
// CostResultWithErrors
// ============================================================================

#[test]
fn test_result_batch_roundtrip_keeps_errors() {
    let resource = web_server();
    let batch = CostResultWithErrors {
        results: vec![CostResult::error_placeholder(&resource, "aws-public", "timeout")],
        errors: vec![ErrorDetail::new(&resource, "aws-public", "timeout")],
    };

    let json = serde_json::to_string(&batch).unwrap();
    let back: CostResultWithErrors = serde_json::from_str(&json).unwrap();

    assert_eq!(back, batch);
    assert!(back.results[0].is_error());
    assert_eq!(back.errors[0].plugin_name, "aws-public");
}

// ============================================================================
// PricingSpec / GroupBy
// ============================================================================

#[test]
fn test_pricing_spec_snake_case_fields() {
    let spec: PricingSpec = serde_json::from_value(json!({
        "provider": "aws",
        "service": "ec2",
        "sku": "t3.micro",
        "region": "us-east-1",
        "billing_mode": "per_hour",
        "rate_per_unit": 0.0104,
        "currency": "USD",
        "pricing": {"on_demand_hourly": 0.0104}
    }))
    .unwrap();

    assert_eq!(spec.rate_per_unit, Some(0.0104));
    assert_eq!(spec.price("on_demand_hourly"), Some(0.0104));
}

#[test]
fn test_group_by_lowercase() {
    assert_eq!(serde_json::to_string(&GroupBy::Monthly).unwrap(), r#""monthly""#);
    let g: GroupBy = serde_json::from_str(r#""provider""#).unwrap();
    assert_eq!(g, GroupBy::Provider);
}
