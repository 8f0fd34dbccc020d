//! Grouping and cross-provider aggregation.
//!
//! Both operations refuse to merge amounts in different currencies. Results
//! without a currency (placeholders for failed resources) do not take part
//! in the check.
//!
//! Time-based grouping places cost on calendar days: `daily_costs` entries map
//! onto consecutive days from `start_date`, and a result with only a span
//! spreads its monthly cost evenly over the days it covers.

use chrono::{Datelike, Days, Months, NaiveDate};
use std::collections::BTreeMap;
use tracing::debug;

use plancost_core::{
    AggregatedGroup, CoreError, CostResult, CrossProviderAggregation, DEFAULT_CURRENCY, GroupBy,
    TimeBucket,
};

const DAY_FORMAT: &str = "%Y-%m-%d";
const MONTH_FORMAT: &str = "%Y-%m";

// ============================================================================
// Helpers
// ============================================================================

/// Returns the single currency shared by `results`.
///
/// Empty currencies are ignored. Defaults to [`DEFAULT_CURRENCY`] when no
/// result has one.
pub fn common_currency(results: &[CostResult]) -> Result<String, CoreError> {
    let mut expected: Option<&str> = None;
    for currency in results.iter().map(|r| r.currency.as_str()) {
        if currency.is_empty() {
            continue;
        }
        match expected {
            None => expected = Some(currency),
            Some(e) if e == currency => {}
            Some(e) => {
                return Err(CoreError::MixedCurrencies {
                    expected: e.to_string(),
                    found: currency.to_string(),
                });
            }
        }
    }
    Ok(expected.unwrap_or(DEFAULT_CURRENCY).to_string())
}

/// Cost of a result per calendar day, or `None` if it has no dates.
#[allow(clippy::cast_precision_loss)]
fn daily_amounts(result: &CostResult) -> Option<Vec<(NaiveDate, f64)>> {
    let start = result.start_date?.date_naive();
    if !result.daily_costs.is_empty() {
        return Some(
            start
                .iter_days()
                .zip(result.daily_costs.iter().copied())
                .collect(),
        );
    }

    let end = result.end_date?.date_naive();
    let days = usize::try_from((end - start).num_days() + 1).ok()?;
    if days == 0 {
        return None;
    }
    let per_day = result.monthly / days as f64;
    Some(start.iter_days().take(days).map(|d| (d, per_day)).collect())
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

fn period_key(date: NaiveDate, group_by: GroupBy) -> String {
    match group_by {
        GroupBy::Monthly => date.format(MONTH_FORMAT).to_string(),
        _ => date.format(DAY_FORMAT).to_string(),
    }
}

// ============================================================================
// Grouping
// ============================================================================

/// Groups results along one dimension, sorted by key.
///
/// For `resource`, `type`, and `provider` every result contributes its
/// monthly, hourly, and total amounts. For `daily` and `monthly` only
/// results with dates contribute, and only to `total`.
pub fn group_results(
    results: &[CostResult],
    group_by: GroupBy,
) -> Result<Vec<AggregatedGroup>, CoreError> {
    let currency = common_currency(results)?;
    let mut groups: BTreeMap<String, AggregatedGroup> = BTreeMap::new();
    let empty = |key: &str| AggregatedGroup {
        key: key.to_string(),
        currency: currency.clone(),
        monthly: 0.0,
        hourly: 0.0,
        total: 0.0,
        count: 0,
    };

    for result in results {
        if group_by.is_time_based() {
            let Some(days) = daily_amounts(result) else {
                debug!(resource = %result.resource_id, "Skipping undated result");
                continue;
            };
            let mut per_period: BTreeMap<String, f64> = BTreeMap::new();
            for (day, amount) in days {
                *per_period.entry(period_key(day, group_by)).or_insert(0.0) += amount;
            }
            for (key, amount) in per_period {
                let group = groups.entry(key.clone()).or_insert_with(|| empty(&key));
                group.total += amount;
                group.count += 1;
            }
        } else {
            let key = match group_by {
                GroupBy::Resource => result.resource_id.as_str(),
                GroupBy::Type => result.resource_type.as_str(),
                _ => result.provider(),
            };
            let group = groups.entry(key.to_string()).or_insert_with(|| empty(key));
            group.monthly += result.monthly;
            group.hourly += result.hourly;
            group.total += result.total();
            group.count += 1;
        }
    }

    Ok(groups.into_values().collect())
}

// ============================================================================
// Cross-Provider Aggregation
// ============================================================================

/// Builds a contiguous day or month time series split by provider.
///
/// # Errors
///
/// Fails on empty input, a non-time `group_by`, mixed currencies, a result
/// whose end precedes its start, or when no result carries dates.
pub fn create_cross_provider_aggregation(
    results: &[CostResult],
    group_by: GroupBy,
) -> Result<CrossProviderAggregation, CoreError> {
    if results.is_empty() {
        return Err(CoreError::EmptyResults);
    }
    if !group_by.is_time_based() {
        return Err(CoreError::InvalidGroupBy(format!(
            "{group_by} (cross-provider aggregation needs daily or monthly)"
        )));
    }
    let currency = common_currency(results)?;

    for result in results {
        if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
            if end < start {
                return Err(CoreError::InvalidDateRange {
                    resource_id: result.resource_id.clone(),
                    start,
                    end,
                });
            }
        }
    }

    let mut placed: Vec<(&str, Vec<(NaiveDate, f64)>)> = Vec::new();
    let mut span: Option<(NaiveDate, NaiveDate)> = None;
    for result in results {
        let Some(days) = daily_amounts(result) else {
            continue;
        };
        let mut last = days.last().map(|(d, _)| *d);
        if let Some(end) = result.end_date {
            last = last.max(Some(end.date_naive()));
        }
        if let (Some((first, _)), Some(last)) = (days.first(), last) {
            span = Some(match span {
                Some((lo, hi)) => (lo.min(*first), hi.max(last)),
                None => (*first, last),
            });
        }
        placed.push((result.provider(), days));
    }

    let Some((first, last)) = span else {
        return Err(CoreError::InvalidData(
            "no result carries a date range".to_string(),
        ));
    };

    let mut buckets: BTreeMap<String, TimeBucket> = BTreeMap::new();
    if group_by == GroupBy::Monthly {
        let mut cursor = month_start(first);
        while cursor <= last {
            let key = period_key(cursor, group_by);
            buckets.insert(key.clone(), TimeBucket::new(key, cursor));
            match cursor.checked_add_months(Months::new(1)) {
                Some(next) => cursor = next,
                None => break,
            }
        }
    } else {
        for day in first.iter_days().take_while(|d| *d <= last) {
            let key = period_key(day, group_by);
            buckets.insert(key.clone(), TimeBucket::new(key, day));
        }
    }

    let mut provider_totals: BTreeMap<String, f64> = BTreeMap::new();
    let mut grand_total = 0.0;
    for (provider, days) in placed {
        for (day, amount) in days {
            if let Some(bucket) = buckets.get_mut(&period_key(day, group_by)) {
                bucket.add(provider, amount);
            }
            *provider_totals.entry(provider.to_string()).or_insert(0.0) += amount;
            grand_total += amount;
        }
    }

    debug!(%group_by, buckets = buckets.len(), grand_total, "Built cross-provider aggregation");
    Ok(CrossProviderAggregation {
        group_by,
        currency,
        buckets: buckets.into_values().collect(),
        provider_totals,
        grand_total,
    })
}

// ============================================================================
// Tests
// ============================================================================
