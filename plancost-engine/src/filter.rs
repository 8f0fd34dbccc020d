//! Resource filter expressions.
//!
//! | Expression | Keeps resources whose |
//! |------------|-----------------------|
//! | `type=<text>` | type contains `text`, ignoring case |
//! | `provider=<text>` | provider contains `text`, ignoring case |
//! | `tag:<key>=<value>` | tag `key` equals `value` exactly |
//!
//! Any other expression keeps every resource.

use tracing::debug;

use plancost_core::ResourceDescriptor;

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceFilter {
    /// Lowercased substring of the resource type.
    Type(String),
    /// Lowercased substring of the provider.
    Provider(String),
    /// Exact tag match.
    Tag {
        /// Tag key.
        key: String,
        /// Tag value.
        value: String,
    },
    /// Keeps everything.
    All,
}

impl ResourceFilter {
    /// Parses an expression. Unrecognized syntax yields [`ResourceFilter::All`].
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        if expr.is_empty() {
            return Self::All;
        }

        if let Some(rest) = expr.strip_prefix("tag:") {
            if let Some((key, value)) = rest.split_once('=') {
                return Self::Tag {
                    key: key.to_string(),
                    value: value.to_string(),
                };
            }
        } else if let Some((field, value)) = expr.split_once('=') {
            match field.trim().to_ascii_lowercase().as_str() {
                "type" => return Self::Type(value.to_lowercase()),
                "provider" => return Self::Provider(value.to_lowercase()),
                _ => {}
            }
        }

        debug!(expr, "Unrecognized filter, keeping all resources");
        Self::All
    }

    /// Returns true if `resource` passes the filter.
    pub fn matches(&self, resource: &ResourceDescriptor) -> bool {
        match self {
            Self::Type(needle) => resource.resource_type().to_lowercase().contains(needle.as_str()),
            Self::Provider(needle) => resource.provider().to_lowercase().contains(needle.as_str()),
            Self::Tag { key, value } => resource.tags().get(key) == Some(value),
            Self::All => true,
        }
    }
}

/// Returns the resources matching `expr`, in input order.
pub fn filter_resources(resources: &[ResourceDescriptor], expr: &str) -> Vec<ResourceDescriptor> {
    let filter = ResourceFilter::parse(expr);
    let kept: Vec<_> = resources
        .iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect();
    debug!(?filter, input = resources.len(), kept = kept.len(), "Filtered resources");
    kept
}

// ============================================================================
// Tests
// ============================================================================
