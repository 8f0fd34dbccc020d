//! Engine error types.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use plancost_core::CoreError;

/// Errors from an orchestration or aggregation call.
///
/// Per-resource plugin failures never surface here; they are recorded in
/// the returned batch instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid input or an aggregation invariant was violated.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The whole query ran past its deadline.
    #[error("Query deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),
}

/// Errors loading local pricing specs.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The spec directory does not exist.
    #[error("Spec directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// A spec file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File or directory path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A spec file is not valid YAML or JSON.
    #[error("Failed to parse {}: {reason}", path.display())]
    Parse {
        /// File path.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },
}
