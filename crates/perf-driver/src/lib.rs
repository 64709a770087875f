//! Perf Driver
//!
//! Adaptive parametrized benchmark driver. Runs every benchmark executable
//! of a thread library test suite in three builds (baseline, alternative
//! thread library, stack-overflow handling), sweeps each over a grid of
//! thread and yield counts, grows the grid while samples stay under a time
//! budget, and aligns the variant results to the baseline for plotting.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use perf_driver::prelude::*;
//!
//! let config = DriverConfig::default();
//! let catalog = Catalog::from_sets(discover(bin_dir)?, &config)?;
//! let registry = HandlerRegistry::standard(&config, &catalog);
//! let invoker = ProcessInvoker::new();
//!
//! let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);
//! let report = Driver::new(engine, catalog.test_ids()).run_all().await;
//! println!("{}", report.generate_text());
//! ```

pub mod catalog;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod invoker;
pub mod logging;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod types;

// Re-exports
pub use error::*;
pub use types::*;

/// Re-export of the types needed to run a sweep
pub mod prelude {
    pub use crate::catalog::{discover, Catalog, ExecutableSets};
    pub use crate::config::{CrashPolicy, DriverConfig, Naming, NamingScheme};
    pub use crate::driver::Driver;
    pub use crate::engine::{SweepContext, SweepEngine};
    pub use crate::error::{CatalogError, ConfigError, DriverError, InvokeError, SweepError};
    pub use crate::invoker::{Invoker, ProcessInvoker};
    pub use crate::reconcile::{reconcile, Reconciliation, ShapeFault};
    pub use crate::registry::{CustomSweep, HandlerRegistry, OverrideMode, OverrideOutcome};
    pub use crate::report::{FaultKind, RunReport, TestReport, VariantFault};
    pub use crate::types::{
        ArgCount, ArgumentGrid, BenchmarkDescriptor, ExecutionSample, Outcome, SweepOutcome,
        SweepResult, TestId, Variant,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
