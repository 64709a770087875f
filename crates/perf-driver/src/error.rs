//! Error types for the benchmark driver
//!
//! Provides error handling for:
//! - Catalog construction and executable resolution
//! - Configuration loading and validation
//! - Benchmark process invocation
//! - Sweep execution

use crate::types::{TestId, Variant};
use std::path::PathBuf;

/// Main driver error type
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Catalog could not be built or queried
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration is invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A sweep failed
    #[error("sweep failed: {0}")]
    Sweep(#[from] SweepError),
}

/// Catalog construction and lookup errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The executable set for a variant was not provided
    #[error("{} executables not found: build them with `{}`", .0, .0.build_hint())]
    MissingVariantSet(Variant),

    /// Two executables claim the same (test, variant) pair
    #[error(
        "duplicate executables for test {test_id} ({variant}): {} and {}",
        .first.display(),
        .second.display()
    )]
    DuplicateEntry {
        /// Test identifier
        test_id: TestId,
        /// Build variant
        variant: Variant,
        /// Executable registered first
        first: PathBuf,
        /// Executable rejected
        second: PathBuf,
    },

    /// No executable is cataloged for the pair
    #[error("no executable for test {test_id} ({variant})")]
    NotFound {
        /// Test identifier
        test_id: TestId,
        /// Build variant
        variant: Variant,
    },

    /// Reading an executable directory failed
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// Directory being listed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    /// Check if the error is a static misconfiguration of the catalog
    #[inline]
    #[must_use]
    pub fn is_configuration_fault(&self) -> bool {
        !matches!(self, Self::NotFound { .. })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An argument grid has no values
    #[error("argument grid `{0}` is empty")]
    EmptyGrid(&'static str),

    /// The extension step must be positive
    #[error("extension step must be positive")]
    ZeroStep,

    /// The time budget must be a positive, finite number of seconds
    #[error("time budget must be positive and finite, got {0}")]
    InvalidBudget(f64),

    /// At least one iteration is needed to compute a mean
    #[error("no-argument iteration count must be positive")]
    ZeroIterations,

    /// A test is declared with both one and two arguments
    #[error("test {0} is declared with both one and two arguments")]
    ConflictingArgCount(TestId),

    /// The configuration file could not be read
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for the driver
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors raised while invoking a benchmark executable
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The process could not be started
    #[error("failed to start {}: {source}", .path.display())]
    Spawn {
        /// Executable path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Sweep errors
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    /// The executable for the sweep could not be resolved
    #[error(transparent)]
    Resolve(#[from] CatalogError),

    /// The invoker itself failed
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    /// A benchmark did not exit cleanly and the crash policy rejects it
    #[error("test {test_id} ({variant}) with arguments {arguments:?}: {outcome}")]
    InvocationFailed {
        /// Test identifier
        test_id: TestId,
        /// Build variant
        variant: Variant,
        /// Arguments of the failing invocation
        arguments: Vec<u64>,
        /// What happened to the process
        outcome: crate::types::Outcome,
    },
}
