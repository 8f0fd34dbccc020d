// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # plancost Engine
//!
//! Orchestration and aggregation for plancost.
//!
//! - [`engine::Engine`] - Fans queries out to cost sources, falls back to
//!   local specs, and records per-resource failures
//! - [`spec`] - Local pricing spec files and the heuristics that price
//!   resources from them
//! - [`aggregate`] - Grouping and cross-provider time series
//! - [`filter`] - Resource filter expressions
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use plancost_engine::{Engine, SpecLoader, group_results};
//! use plancost_core::GroupBy;
//!
//! let specs = SpecLoader::new("specs").load()?;
//! let engine = Engine::new(Arc::new(registry)).with_specs(specs);
//!
//! let batch = engine.get_projected_cost(&resources).await?;
//! if batch.has_errors() {
//!     eprintln!("{}", batch.error_summary());
//! }
//! let by_provider = group_results(&batch.results, GroupBy::Provider)?;
//! ```

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod filter;
pub mod spec;

pub use aggregate::{common_currency, create_cross_provider_aggregation, group_results};
pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, SpecError};
pub use filter::{ResourceFilter, filter_resources};
pub use spec::{Heuristic, LocalSpecResolver, SpecLoader, SpecStore};
