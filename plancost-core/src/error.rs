//! Core error types for plancost.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Core error type for plancost operations.
///
/// Aggregation invariant violations live here because they are raised by the
/// model types themselves (currency checks, date ranges) and must reach the
/// caller verbatim.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Aggregation was requested over an empty result set.
    #[error("No results to aggregate")]
    EmptyResults,

    /// Results carry more than one currency.
    #[error("Mixed currencies: expected {expected}, found {found}")]
    MixedCurrencies {
        /// The currency established by the first priced result.
        expected: String,
        /// The conflicting currency.
        found: String,
    },

    /// A result's date range ends before it starts.
    #[error("Invalid date range for {resource_id}: end {end} is before start {start}")]
    InvalidDateRange {
        /// Resource the result belongs to.
        resource_id: String,
        /// Start of the range.
        start: DateTime<Utc>,
        /// End of the range.
        end: DateTime<Utc>,
    },

    /// A query time range ends before it starts.
    #[error("Invalid time range: end {end} is before start {start}")]
    InvalidTimeRange {
        /// Start of the range.
        start: DateTime<Utc>,
        /// End of the range.
        end: DateTime<Utc>,
    },

    /// Unknown or unsupported group-by dimension.
    #[error("Invalid group-by: {0}")]
    InvalidGroupBy(String),

    /// Invalid data supplied by a plugin or spec file.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
