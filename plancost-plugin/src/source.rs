//! Cost source trait.
//!
//! A [`CostSource`] is anything that can price resources: a launched plugin
//! ([`PluginClient`](crate::client::PluginClient)) or an in-process fake in
//! tests. The engine only sees this trait.

use async_trait::async_trait;
use std::collections::BTreeMap;

use plancost_core::{CostResult, PricingSpec, ResourceDescriptor, TimeRange};

use crate::error::PluginError;
use crate::protocol::{SupportsResponse, methods};

// ============================================================================
// Actual Cost Request
// ============================================================================

/// Query for historical costs.
#[derive(Debug, Clone, PartialEq)]
pub struct ActualCostRequest {
    /// Resources to query. Only their ids go over the wire.
    pub resources: Vec<ResourceDescriptor>,
    /// Query window.
    pub range: TimeRange,
    /// Tag filter.
    pub tags: BTreeMap<String, String>,
}

impl ActualCostRequest {
    /// Creates a request with no tag filter.
    pub fn new(resources: Vec<ResourceDescriptor>, range: TimeRange) -> Self {
        Self {
            resources,
            range,
            tags: BTreeMap::new(),
        }
    }

    /// Sets the tag filter.
    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// Ids of the requested resources.
    pub fn resource_ids(&self) -> Vec<&str> {
        self.resources.iter().map(ResourceDescriptor::id).collect()
    }
}

// ============================================================================
// Cost Source Trait
// ============================================================================

/// A named source of cost data.
///
/// Only [`name`](CostSource::name) and
/// [`get_projected_cost`](CostSource::get_projected_cost) are required. The
/// defaults describe a source that supports everything and implements none
/// of the optional calls.
#[async_trait]
pub trait CostSource: Send + Sync {
    /// Unique source name.
    fn name(&self) -> &str;

    /// Whether this source can price `resource`.
    async fn supports(&self, _resource: &ResourceDescriptor) -> Result<SupportsResponse, PluginError> {
        Ok(SupportsResponse::supported())
    }

    /// Projected monthly costs.
    ///
    /// Results may be fewer than `resources`; each carries its resource id.
    async fn get_projected_cost(
        &self,
        resources: &[ResourceDescriptor],
    ) -> Result<Vec<CostResult>, PluginError>;

    /// Historical costs over a time range.
    async fn get_actual_cost(
        &self,
        _request: &ActualCostRequest,
    ) -> Result<Vec<CostResult>, PluginError> {
        Err(PluginError::Unimplemented {
            plugin: self.name().to_string(),
            method: methods::GET_ACTUAL_COST,
        })
    }

    /// Static pricing for `resource`, if known.
    async fn get_pricing_spec(
        &self,
        _resource: &ResourceDescriptor,
    ) -> Result<Option<PricingSpec>, PluginError> {
        Ok(None)
    }

    /// Releases any resources held by the source.
    async fn close(&self) {}
}
