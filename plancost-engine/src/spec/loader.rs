//! Loading and looking up local pricing specs.
//!
//! A spec directory holds `*.yaml`, `*.yml`, or `*.json` files. Each file
//! contains one spec, a list of specs, or a mapping with a `specs` list.
//!
//! ```yaml
//! specs:
//!   - provider: aws
//!     service: ec2
//!     sku: t3.micro
//!     region: us-east-1
//!     billing_mode: per_hour
//!     rate_per_unit: 0.0104
//! ```

use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

use plancost_core::{PricingSpec, ResourceDescriptor};

use crate::error::SpecError;

/// SKU used for service-wide specs and resources without a SKU property.
pub const DEFAULT_SKU: &str = "default";

/// Properties naming a SKU, in priority order.
pub const SKU_KEYS: &[&str] = &[
    "instanceType",
    "instanceClass",
    "sku",
    "size",
    "vmSize",
    "machineType",
    "type",
];

/// Properties naming a region, in priority order.
pub const REGION_KEYS: &[&str] = &["region", "location", "availabilityZone"];

/// Trailing zone letter of an availability zone, e.g. `us-east-1a`.
static ZONE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+(?:-[a-z]+)+-\d+)[a-z]$").expect("Invalid regex"));

#[derive(Deserialize)]
#[serde(untagged)]
enum SpecFile {
    Many(Vec<PricingSpec>),
    Wrapped { specs: Vec<PricingSpec> },
    One(Box<PricingSpec>),
}

impl SpecFile {
    fn into_specs(self) -> Vec<PricingSpec> {
        match self {
            Self::Many(specs) | Self::Wrapped { specs } => specs,
            Self::One(spec) => vec![*spec],
        }
    }
}

// ============================================================================
// Lookup Keys
// ============================================================================

/// SKU of a resource, or [`DEFAULT_SKU`].
pub fn resource_sku(resource: &ResourceDescriptor) -> &str {
    resource.first_str(SKU_KEYS).unwrap_or(DEFAULT_SKU)
}

/// Region of a resource with any zone letter removed.
pub fn resource_region(resource: &ResourceDescriptor) -> Option<String> {
    let raw = resource.first_str(REGION_KEYS)?.trim().to_ascii_lowercase();
    let region = match ZONE_SUFFIX_RE.captures(&raw) {
        Some(caps) => caps[1].to_string(),
        None => raw,
    };
    Some(region)
}

// ============================================================================
// Spec Store
// ============================================================================

/// In-memory set of pricing specs.
#[derive(Debug, Clone, Default)]
pub struct SpecStore {
    specs: Vec<PricingSpec>,
}

impl SpecStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from specs.
    pub fn with_specs(specs: Vec<PricingSpec>) -> Self {
        Self { specs }
    }

    /// All specs, in load order.
    pub fn specs(&self) -> &[PricingSpec] {
        &self.specs
    }

    /// Number of specs.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true if the store holds no specs.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Finds the spec for a resource.
    ///
    /// Tries the exact region, then a region-less spec for the same SKU,
    /// then the service's [`DEFAULT_SKU`] spec in the same two steps.
    pub fn lookup(&self, resource: &ResourceDescriptor) -> Option<&PricingSpec> {
        let provider = resource.provider();
        let service = resource.service();
        let sku = resource_sku(resource);
        let region = resource_region(resource);

        let candidates = self.specs.iter().filter(|spec| {
            spec.provider.eq_ignore_ascii_case(provider) && spec.service.eq_ignore_ascii_case(service)
        });

        let find = |sku: &str| {
            let same_sku = || candidates.clone().filter(move |s| s.sku.eq_ignore_ascii_case(sku));
            region
                .as_deref()
                .and_then(|region| {
                    same_sku().find(|s| {
                        s.region
                            .as_deref()
                            .is_some_and(|r| r.eq_ignore_ascii_case(region))
                    })
                })
                .or_else(|| same_sku().find(|s| s.region.is_none()))
        };

        let found = find(sku).or_else(|| find(DEFAULT_SKU));
        if let Some(spec) = found {
            debug!(resource = %resource.id(), spec = %spec.key(), "Matched local spec");
        }
        found
    }
}

// ============================================================================
// Spec Loader
// ============================================================================

/// Reads pricing specs from a directory.
#[derive(Debug, Clone)]
pub struct SpecLoader {
    dir: PathBuf,
}

impl SpecLoader {
    /// Creates a loader for `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Loads every spec file in the directory, in file name order.
    ///
    /// Unreadable or malformed files are skipped with a warning.
    pub fn load(&self) -> Result<SpecStore, SpecError> {
        if !self.dir.is_dir() {
            return Err(SpecError::DirectoryNotFound(self.dir.clone()));
        }

        let entries = fs::read_dir(&self.dir).map_err(|source| SpecError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_spec_file(path))
            .collect();
        files.sort();

        let mut specs = Vec::new();
        for path in files {
            match load_file(&path) {
                Ok(mut loaded) => {
                    debug!(path = %path.display(), count = loaded.len(), "Loaded spec file");
                    specs.append(&mut loaded);
                }
                Err(e) => warn!(error = %e, "Skipping spec file"),
            }
        }

        debug!(dir = %self.dir.display(), count = specs.len(), "Local specs loaded");
        Ok(SpecStore::with_specs(specs))
    }
}

fn is_spec_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "yaml" | "yml" | "json"))
}

/// Parses one spec file, stamping each spec with its source path.
pub fn load_file(path: &Path) -> Result<Vec<PricingSpec>, SpecError> {
    let content = fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed: SpecFile = if is_json {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    }
    .map_err(|reason| SpecError::Parse {
        path: path.to_path_buf(),
        reason,
    })?;

    let source = path.display().to_string();
    Ok(parsed
        .into_specs()
        .into_iter()
        .map(|mut spec| {
            if spec.source.is_empty() {
                spec.source.clone_from(&source);
            }
            spec
        })
        .collect())
}

// ============================================================================
// Tests
// ============================================================================
