//! Local pricing specs.
//!
//! - [`loader`] - Reads spec files and matches them to resources
//! - [`resolver`] - Turns a matched spec into a cost estimate

pub mod loader;
pub mod resolver;

pub use loader::{SpecLoader, SpecStore};
pub use resolver::{Heuristic, LocalSpecResolver};
