//! Grouping and time-series aggregation types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ============================================================================
// Group By
// ============================================================================

/// Dimension along which results are summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// One group per resource id.
    Resource,
    /// One group per resource type.
    Type,
    /// One group per provider prefix.
    Provider,
    /// One group per calendar day.
    Daily,
    /// One group per calendar month.
    Monthly,
}

impl GroupBy {
    /// Returns all dimensions.
    pub fn all() -> &'static [GroupBy] {
        &[
            Self::Resource,
            Self::Type,
            Self::Provider,
            Self::Daily,
            Self::Monthly,
        ]
    }

    /// Returns true for the calendar dimensions.
    pub fn is_time_based(&self) -> bool {
        matches!(self, Self::Daily | Self::Monthly)
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Type => "type",
            Self::Provider => "provider",
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupBy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resource" => Ok(Self::Resource),
            "type" => Ok(Self::Type),
            "provider" => Ok(Self::Provider),
            "daily" | "date" | "day" => Ok(Self::Daily),
            "monthly" | "month" => Ok(Self::Monthly),
            other => Err(CoreError::InvalidGroupBy(other.to_string())),
        }
    }
}

// ============================================================================
// Time Range
// ============================================================================

/// A closed time range for actual-cost queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Inclusive end.
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a range and validates it.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CoreError> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    /// Rejects ranges that end before they start. Zero-length ranges are valid.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.end < self.start {
            return Err(CoreError::InvalidTimeRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Number of calendar days touched by the range, at least one.
    pub fn days(&self) -> i64 {
        (self.end.date_naive() - self.start.date_naive()).num_days() + 1
    }
}

// ============================================================================
// Grouped Output
// ============================================================================

/// Summary of all results sharing one group key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedGroup {
    /// Group key (resource id, type, provider, `YYYY-MM-DD`, or `YYYY-MM`).
    pub key: String,
    /// Shared currency.
    pub currency: String,
    /// Sum of monthly costs (non-time groupings only).
    pub monthly: f64,
    /// Sum of hourly costs (non-time groupings only).
    pub hourly: f64,
    /// Total amount attributed to the group.
    pub total: f64,
    /// Number of results contributing.
    pub count: usize,
}

// ============================================================================
// Cross-Provider Aggregation
// ============================================================================

/// One day or month of a cross-provider time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBucket {
    /// Bucket label, `YYYY-MM-DD` or `YYYY-MM`.
    pub period: String,
    /// First calendar day of the bucket.
    pub start: NaiveDate,
    /// Total across providers.
    pub total: f64,
    /// Cost per provider.
    pub providers: BTreeMap<String, f64>,
}

impl TimeBucket {
    /// Creates an empty bucket.
    pub fn new(period: impl Into<String>, start: NaiveDate) -> Self {
        Self {
            period: period.into(),
            start,
            total: 0.0,
            providers: BTreeMap::new(),
        }
    }

    /// Adds an amount for a provider.
    pub fn add(&mut self, provider: &str, amount: f64) {
        self.total += amount;
        *self.providers.entry(provider.to_string()).or_insert(0.0) += amount;
    }
}

/// Time-bucketed summary of cost across providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossProviderAggregation {
    /// Bucket granularity.
    pub group_by: GroupBy,
    /// Shared currency of all contributing results.
    pub currency: String,
    /// Contiguous buckets from the earliest to the latest date observed.
    pub buckets: Vec<TimeBucket>,
    /// Totals per provider over the whole span.
    pub provider_totals: BTreeMap<String, f64>,
    /// Total over the whole span.
    pub grand_total: f64,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_group_by_parse() {
        assert_eq!("resource".parse::<GroupBy>().unwrap(), GroupBy::Resource);
        assert_eq!("TYPE".parse::<GroupBy>().unwrap(), GroupBy::Type);
        assert_eq!("date".parse::<GroupBy>().unwrap(), GroupBy::Daily);
        assert_eq!("monthly".parse::<GroupBy>().unwrap(), GroupBy::Monthly);
        assert!(matches!(
            "region".parse::<GroupBy>(),
            Err(CoreError::InvalidGroupBy(_))
        ));
    }

    #[test]
    fn test_group_by_display_roundtrip() {
        for g in GroupBy::all() {
            assert_eq!(g.to_string().parse::<GroupBy>().unwrap(), *g);
        }
    }

    #[test]
    fn test_time_range_validation() {
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();

        assert!(TimeRange::new(start, end).is_err());
        assert!(TimeRange::new(start, start).is_ok());
        assert_eq!(TimeRange::new(end, start).unwrap().days(), 6);
    }

    #[test]
    fn test_bucket_add() {
        let mut bucket = TimeBucket::new("2024-01", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        bucket.add("aws", 2.0);
        bucket.add("aws", 1.0);
        bucket.add("gcp", 4.0);
        assert_eq!(bucket.total, 7.0);
        assert_eq!(bucket.providers["aws"], 3.0);
    }
}
