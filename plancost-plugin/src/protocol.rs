//! Wire types for the plugin protocol.
//!
//! Plugins speak JSON-RPC 2.0 with one JSON object per line. The host sends
//! requests with the method names in [`methods`] and the parameter types
//! below. Responses carry plugin-shaped results which the client converts
//! into [`CostResult`]s.
//!
//! # Example
//!
//! ```text
//! -> {"jsonrpc":"2.0","id":3,"method":"Supports","params":{"resource":{...}}}
//! <- {"jsonrpc":"2.0","id":3,"result":{"supported":true}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use plancost_core::{CostResult, PricingSpec, ResourceDescriptor};

use crate::source::ActualCostRequest;

/// Protocol version implemented by this host.
pub const SPEC_VERSION: &str = "1.2.0";

/// Environment variable telling a TCP plugin to choose its own port.
pub const PORT_ENV_VAR: &str = "PLANCOST_PLUGIN_PORT";

/// RPC method names.
pub mod methods {
    /// Plugin name.
    pub const NAME: &str = "Name";
    /// Whether a resource can be priced.
    pub const SUPPORTS: &str = "Supports";
    /// Projected costs for a batch of resources.
    pub const GET_PROJECTED_COST: &str = "GetProjectedCost";
    /// Historical costs for resource ids over a time range.
    pub const GET_ACTUAL_COST: &str = "GetActualCost";
    /// Static pricing for a resource.
    pub const GET_PRICING_SPEC: &str = "GetPricingSpec";
    /// Optional metadata including the spec version.
    pub const GET_PLUGIN_INFO: &str = "GetPluginInfo";
    /// Notification asking the plugin to exit.
    pub const SHUTDOWN: &str = "Shutdown";
}

// ============================================================================
// Requests
// ============================================================================

/// Parameters with no fields.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EmptyParams {}

/// Parameters carrying a single resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceParams<'a> {
    /// The resource.
    pub resource: &'a ResourceDescriptor,
}

/// Parameters for `GetProjectedCost`.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectedCostParams<'a> {
    /// Resources to price.
    pub resources: &'a [ResourceDescriptor],
}

/// Parameters for `GetActualCost`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualCostParams<'a> {
    /// Resource ids to query.
    pub resource_ids: Vec<&'a str>,
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Inclusive end.
    pub end: DateTime<Utc>,
    /// Tag filter.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl<'a> ActualCostParams<'a> {
    /// Builds the wire parameters for a request.
    pub fn new(request: &'a ActualCostRequest) -> Self {
        Self {
            resource_ids: request.resource_ids(),
            start: request.range.start,
            end: request.range.end,
            tags: request.tags.clone(),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Response to `Name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameResponse {
    /// Plugin name.
    pub name: String,
}

/// Response to `Supports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportsResponse {
    /// Whether the resource can be priced.
    pub supported: bool,
    /// Why not, when unsupported.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

impl SupportsResponse {
    /// A positive answer.
    pub fn supported() -> Self {
        Self {
            supported: true,
            reason: String::new(),
        }
    }

    /// A negative answer with a reason.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self {
            supported: false,
            reason: reason.into(),
        }
    }
}

/// Response to `GetProjectedCost` and `GetActualCost`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostResponse {
    /// One entry per priced resource.
    #[serde(default)]
    pub results: Vec<PluginCost>,
}

/// A cost as reported by a plugin.
///
/// Plugins may omit the resource type and adapter; the client fills them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginCost {
    /// Resource id. May be empty when a single resource was requested.
    #[serde(default)]
    pub resource_id: String,
    /// ISO currency code.
    #[serde(default)]
    pub currency: String,
    /// Monthly cost.
    #[serde(default)]
    pub monthly: f64,
    /// Hourly cost.
    #[serde(default)]
    pub hourly: f64,
    /// Per-day amounts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub daily_costs: Vec<f64>,
    /// Period start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    /// Period end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Free-text notes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl PluginCost {
    /// Converts into a [`CostResult`] for `resource`, attributed to `adapter`.
    ///
    /// A missing hourly or monthly figure is derived from the other.
    pub fn into_result(self, resource: &ResourceDescriptor, adapter: &str) -> CostResult {
        let mut result = CostResult::new(resource, adapter).with_currency(self.currency);
        if self.monthly == 0.0 && self.hourly != 0.0 {
            result = result.with_hourly(self.hourly);
        } else if self.hourly == 0.0 {
            result = result.with_monthly(self.monthly);
        } else {
            result.monthly = self.monthly;
            result.hourly = self.hourly;
        }
        result.daily_costs = self.daily_costs;
        result.start_date = self.start_date;
        result.end_date = self.end_date;
        result.with_notes(self.notes)
    }
}

/// Response to `GetPricingSpec`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingSpecResponse {
    /// The spec, when the plugin has one.
    #[serde(default)]
    pub spec: Option<PricingSpec>,
}

/// Response to `GetPluginInfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    /// Plugin name.
    #[serde(default)]
    pub name: String,
    /// Plugin release version.
    #[serde(default)]
    pub version: String,
    /// Protocol version the plugin implements.
    #[serde(default)]
    pub spec_version: Option<String>,
    /// Providers the plugin can price.
    #[serde(default)]
    pub providers: Vec<String>,
}

// ============================================================================
// Tests
// ============================================================================
