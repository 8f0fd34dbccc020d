//! Resource descriptors.
//!
//! A [`ResourceDescriptor`] is the read-only reference to one cloud resource
//! taken from an infrastructure plan. The plan-parsing layer builds these;
//! the core only reads them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Provider name used when a type carries no provider prefix.
pub const UNKNOWN_PROVIDER: &str = "unknown";

/// Separator between the provider prefix and the rest of a resource type.
const TYPE_SEPARATOR: char = ':';

/// Extracts the provider prefix from a resource type.
///
/// `"aws:ec2/instance:Instance"` yields `"aws"`. Types without a separator,
/// or with an empty prefix, yield [`UNKNOWN_PROVIDER`].
pub fn provider_from_type(resource_type: &str) -> &str {
    match resource_type.split_once(TYPE_SEPARATOR) {
        Some((prefix, _)) if !prefix.is_empty() => prefix,
        _ => UNKNOWN_PROVIDER,
    }
}

// ============================================================================
// Resource Descriptor
// ============================================================================

/// A cloud resource reference with loosely-typed properties.
///
/// Fields are private so that a descriptor cannot change after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    id: String,
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
    #[serde(default)]
    properties: BTreeMap<String, Value>,
}

impl ResourceDescriptor {
    /// Creates a descriptor with no explicit provider and no properties.
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            provider: None,
            properties: BTreeMap::new(),
        }
    }

    /// Sets an explicit provider, overriding the one derived from the type.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Adds a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Unique id within the request batch.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Provider-qualified resource kind.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Provider name, explicit or derived from the type prefix.
    pub fn provider(&self) -> &str {
        match self.provider.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => provider_from_type(&self.resource_type),
        }
    }

    /// Service/module segment of the type.
    ///
    /// `"aws:ec2/instance:Instance"` yields `"ec2"` and
    /// `"azure-native:compute:VirtualMachine"` yields `"compute"`.
    pub fn service(&self) -> &str {
        let Some((_, rest)) = self.resource_type.split_once(TYPE_SEPARATOR) else {
            return "";
        };
        rest.split(['/', TYPE_SEPARATOR]).next().unwrap_or("")
    }

    /// All properties.
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Returns a property by key.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Returns a property as a string slice, if it is a non-empty string.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Returns a property as a number. Numeric strings are accepted.
    pub fn property_f64(&self, key: &str) -> Option<f64> {
        match self.properties.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the first present string property among `keys`.
    pub fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.property_str(k))
    }

    /// Returns the first present numeric property among `keys`.
    pub fn first_f64(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|k| self.property_f64(k))
    }

    /// Resource tags, read from `tags` and falling back to `tagsAll`.
    ///
    /// Non-string tag values are rendered with their JSON representation.
    pub fn tags(&self) -> BTreeMap<String, String> {
        let tags = self
            .properties
            .get("tags")
            .and_then(Value::as_object)
            .or_else(|| self.properties.get("tagsAll").and_then(Value::as_object));

        tags.map(|map| {
            map.iter()
                .map(|(k, v)| {
                    let value = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
