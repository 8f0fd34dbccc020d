//! Static pricing specifications.
//!
//! A [`PricingSpec`] describes the list price of one SKU. Plugins return them
//! from `GetPricingSpec`, and bundled spec files use the same shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Billing Mode
// ============================================================================

/// How `rate_per_unit` is charged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingMode {
    /// Charged per running hour.
    PerHour,
    /// Charged per month.
    PerMonth,
    /// Charged per GB stored per month.
    PerGbMonth,
    /// Charged per request.
    PerRequest,
    /// Flat monthly fee.
    Flat,
    /// Anything this version does not understand.
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for BillingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PerHour => "per_hour",
            Self::PerMonth => "per_month",
            Self::PerGbMonth => "per_gb_month",
            Self::PerRequest => "per_request",
            Self::Flat => "flat",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Pricing Spec
// ============================================================================

/// List price for one provider/service/SKU/region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PricingSpec {
    /// Provider, e.g. `aws`.
    pub provider: String,
    /// Service, e.g. `ec2`.
    pub service: String,
    /// SKU, e.g. `t3.micro`. `default` applies to the whole service.
    pub sku: String,
    /// Region the price applies to. `None` means any region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// How the rate is charged.
    #[serde(default)]
    pub billing_mode: BillingMode,
    /// Price per billing unit.
    #[serde(default)]
    pub rate_per_unit: Option<f64>,
    /// ISO currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Additional named prices (`monthly_estimate`, `price_per_gb_month`, ...).
    #[serde(default)]
    pub pricing: BTreeMap<String, Value>,
    /// Where the spec came from (file path or plugin name).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
}

fn default_currency() -> String {
    super::cost::DEFAULT_CURRENCY.to_string()
}

impl PricingSpec {
    /// Creates a spec with no prices.
    pub fn new(
        provider: impl Into<String>,
        service: impl Into<String>,
        sku: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            service: service.into(),
            sku: sku.into(),
            region: None,
            billing_mode: BillingMode::Unknown,
            rate_per_unit: None,
            currency: default_currency(),
            description: String::new(),
            pricing: BTreeMap::new(),
            source: String::new(),
        }
    }

    /// Sets the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the rate and billing mode.
    pub fn with_rate(mut self, rate: f64, mode: BillingMode) -> Self {
        self.rate_per_unit = Some(rate);
        self.billing_mode = mode;
        self
    }

    /// Adds a named price.
    pub fn with_price(mut self, key: impl Into<String>, value: f64) -> Self {
        self.pricing.insert(key.into(), Value::from(value));
        self
    }

    /// Sets the currency.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Returns a named price as a number. Numeric strings are accepted.
    pub fn price(&self, key: &str) -> Option<f64> {
        match self.pricing.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Short identifier, `provider/service/sku[@region]`.
    pub fn key(&self) -> String {
        match &self.region {
            Some(region) => format!("{}/{}/{}@{}", self.provider, self.service, self.sku, region),
            None => format!("{}/{}/{}", self.provider, self.service, self.sku),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
