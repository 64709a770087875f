//! Handler Registry
//!
//! Maps a test ID to the routine that sweeps it. Most tests use the generic
//! sweep engine; a registered custom handler replaces it entirely for its
//! test. The mapping is resolved once, when the catalog is built.

use crate::catalog::Catalog;
use crate::config::DriverConfig;
use crate::engine::SweepContext;
use crate::error::SweepError;
use crate::types::{ArgCount, ArgumentGrid, SweepOutcome, SweepResult, TestId, Variant};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Test whose thread count is swept over [`DENSE_THREAD_GRID`]
pub const DENSE_GRID_TEST: TestId = TestId(51);

/// Thread counts used for [`DENSE_GRID_TEST`]
pub const DENSE_THREAD_GRID: [u64; 11] = [1, 2, 5, 7, 10, 12, 15, 20, 22, 25, 27];

/// Sweep routine replacing the generic engine for one test
#[async_trait::async_trait]
pub trait CustomSweep: Send + Sync + fmt::Debug {
    /// Grid of argument values the handler sweeps
    fn grid(&self) -> ArgumentGrid;

    /// Run the sweep for one variant
    async fn run(
        &self,
        test_id: TestId,
        variant: Variant,
        ctx: &SweepContext<'_>,
    ) -> Result<SweepOutcome, SweepError>;
}

/// How a test is swept
#[derive(Debug, Clone)]
pub enum Handler {
    /// Generic base-grid sweep with adaptive extension
    Generic,
    /// Test-specific routine
    Custom(Arc<dyn CustomSweep>),
}

/// Whether an override should execute or only describe its grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideMode {
    /// Run the benchmark
    Execute,
    /// Return the grid without running anything
    Display,
}

/// What an override produced
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideOutcome {
    /// Measured sweep
    Result(SweepOutcome),
    /// Grid the override would sweep
    Grid(ArgumentGrid),
}

/// Registry of per-test sweep handlers
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TestId, Handler>,
}

impl HandlerRegistry {
    /// Create an empty registry; every test uses the generic engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard handlers for `catalog`
    ///
    /// Every no-argument test gets [`MeanOfIterations`];
    /// [`DENSE_GRID_TEST`] gets [`FixedGrid`] over [`DENSE_THREAD_GRID`].
    pub fn standard(config: &DriverConfig, catalog: &Catalog) -> Self {
        let mut registry = Self::new();
        let mean = Arc::new(MeanOfIterations::new(config.no_arg_iterations));
        for test_id in catalog.test_ids() {
            if config.arg_count(test_id) == ArgCount::Zero {
                registry.register(test_id, mean.clone());
            }
        }
        registry.register(
            DENSE_GRID_TEST,
            Arc::new(FixedGrid::new(DENSE_THREAD_GRID.to_vec())),
        );
        registry
    }

    /// Register a custom handler, replacing any previous one
    pub fn register(&mut self, test_id: TestId, handler: Arc<dyn CustomSweep>) {
        self.handlers.insert(test_id, Handler::Custom(handler));
    }

    /// Handler for `test_id`
    pub fn handler(&self, test_id: TestId) -> Handler {
        self.handlers.get(&test_id).cloned().unwrap_or(Handler::Generic)
    }

    /// Check if `test_id` has a custom handler
    pub fn has_override(&self, test_id: TestId) -> bool {
        matches!(self.handlers.get(&test_id), Some(Handler::Custom(_)))
    }

    /// Grid an override would sweep, if `test_id` has one
    pub fn display_grid(&self, test_id: TestId) -> Option<ArgumentGrid> {
        match self.handlers.get(&test_id) {
            Some(Handler::Custom(handler)) => Some(handler.grid()),
            _ => None,
        }
    }

    /// Run or describe the override of `test_id`
    ///
    /// Returns `Ok(None)` if the test has no override.
    pub async fn invoke_override(
        &self,
        test_id: TestId,
        variant: Variant,
        mode: OverrideMode,
        ctx: &SweepContext<'_>,
    ) -> Result<Option<OverrideOutcome>, SweepError> {
        let Handler::Custom(handler) = self.handler(test_id) else {
            return Ok(None);
        };
        match mode {
            OverrideMode::Display => Ok(Some(OverrideOutcome::Grid(handler.grid()))),
            OverrideMode::Execute => {
                tracing::debug!("Test {test_id} ({variant}) uses custom handler {handler:?}");
                let outcome = handler.run(test_id, variant, ctx).await?;
                Ok(Some(OverrideOutcome::Result(outcome)))
            }
        }
    }
}

/// Runs a no-argument benchmark several times and reports the mean latency
#[derive(Debug, Clone, Copy)]
pub struct MeanOfIterations {
    iterations: u32,
}

impl MeanOfIterations {
    /// Average over `iterations` runs (at least one)
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }
}

#[async_trait::async_trait]
impl CustomSweep for MeanOfIterations {
    fn grid(&self) -> ArgumentGrid {
        ArgumentGrid::NoArguments
    }

    async fn run(
        &self,
        test_id: TestId,
        variant: Variant,
        ctx: &SweepContext<'_>,
    ) -> Result<SweepOutcome, SweepError> {
        let descriptor = ctx.resolve(test_id, variant)?;
        tracing::info!("{}", descriptor.path.display());
        let mut total = 0.0;
        for _ in 0..self.iterations {
            total += ctx.measure(descriptor, &[]).await?;
        }
        Ok(SweepOutcome {
            result: SweepResult::Scalar(total / f64::from(self.iterations)),
            grid: ArgumentGrid::NoArguments,
        })
    }
}

/// Sweeps a one-argument benchmark over its own grid, without extension
#[derive(Debug, Clone)]
pub struct FixedGrid {
    values: Vec<u64>,
}

impl FixedGrid {
    /// Sweep over `values` in order
    pub fn new(values: Vec<u64>) -> Self {
        Self { values }
    }
}

#[async_trait::async_trait]
impl CustomSweep for FixedGrid {
    fn grid(&self) -> ArgumentGrid {
        ArgumentGrid::Linear {
            values: self.values.clone(),
        }
    }

    async fn run(
        &self,
        test_id: TestId,
        variant: Variant,
        ctx: &SweepContext<'_>,
    ) -> Result<SweepOutcome, SweepError> {
        let descriptor = ctx.resolve(test_id, variant)?;
        let mut latencies = Vec::with_capacity(self.values.len());
        for &value in &self.values {
            latencies.push(ctx.measure(descriptor, &[value]).await?);
        }
        Ok(SweepOutcome {
            result: SweepResult::Series(latencies),
            grid: self.grid(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ExecutableSets;
    use std::path::PathBuf;

    fn catalog(config: &DriverConfig) -> Catalog {
        let sets = ExecutableSets {
            baseline: ["bin/01-main", "bin/12-join", "bin/21-create-many", "bin/51-fibonacci"]
                .iter()
                .map(PathBuf::from)
                .collect(),
            thread_library: Some(Vec::new()),
            stack_overflow_handling: Some(Vec::new()),
        };
        Catalog::from_sets(sets, config).unwrap()
    }

    #[test]
    fn standard_registry_overrides_no_argument_tests() {
        let config = DriverConfig::default();
        let registry = HandlerRegistry::standard(&config, &catalog(&config));

        assert!(registry.has_override(TestId(1)));
        assert!(registry.has_override(TestId(12)));
        assert!(!registry.has_override(TestId(21)));
        assert!(matches!(registry.handler(TestId(21)), Handler::Generic));
    }

    #[test]
    fn dense_grid_test_displays_its_own_grid() {
        let config = DriverConfig::default();
        let registry = HandlerRegistry::standard(&config, &catalog(&config));

        assert_eq!(
            registry.display_grid(DENSE_GRID_TEST),
            Some(ArgumentGrid::Linear {
                values: DENSE_THREAD_GRID.to_vec()
            })
        );
        assert_eq!(registry.display_grid(TestId(21)), None);
    }

    #[test]
    fn mean_needs_at_least_one_iteration() {
        assert_eq!(MeanOfIterations::new(0).iterations, 1);
    }
}
