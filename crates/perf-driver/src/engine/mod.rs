//! Sweep Engine
//!
//! Runs a benchmark over the base argument grid and hands the result to
//! adaptive extension while the edge of the grid is still under budget.
//!
//! # Ordering
//!
//! Invocations are strictly sequential: each one is awaited before the
//! next is issued. Results are stored in grid order, one row per outer
//! value for two-argument tests.

pub mod extension;

use crate::catalog::Catalog;
use crate::config::{CrashPolicy, DriverConfig};
use crate::error::{CatalogError, SweepError};
use crate::invoker::Invoker;
use crate::registry::{HandlerRegistry, OverrideMode, OverrideOutcome};
use crate::types::{
    ArgCount, ArgumentGrid, BenchmarkDescriptor, SweepOutcome, SweepResult, TestId, Variant,
};

/// Read-only state shared by the engine and custom handlers
#[derive(Clone, Copy)]
pub struct SweepContext<'a> {
    config: &'a DriverConfig,
    catalog: &'a Catalog,
    invoker: &'a dyn Invoker,
}

impl<'a> SweepContext<'a> {
    /// Create a context over `catalog`, running benchmarks with `invoker`
    pub fn new(config: &'a DriverConfig, catalog: &'a Catalog, invoker: &'a dyn Invoker) -> Self {
        Self {
            config,
            catalog,
            invoker,
        }
    }

    /// Driver configuration
    pub fn config(&self) -> &'a DriverConfig {
        self.config
    }

    /// Resolve the executable of a (test, variant) pair
    pub fn resolve(
        &self,
        test_id: TestId,
        variant: Variant,
    ) -> Result<&'a BenchmarkDescriptor, CatalogError> {
        self.catalog.resolve(test_id, variant)
    }

    /// Run `descriptor` once and return its latency in seconds
    ///
    /// A benchmark that exits non-zero or is killed by a signal is handled
    /// according to the configured [`CrashPolicy`].
    pub async fn measure(
        &self,
        descriptor: &BenchmarkDescriptor,
        arguments: &[u64],
    ) -> Result<f64, SweepError> {
        let sample = self.invoker.invoke(&descriptor.path, arguments).await?;
        let seconds = sample.seconds();
        tracing::debug!(
            "Test {} ({}) {:?}: {:.6}s",
            descriptor.test_id,
            descriptor.variant,
            arguments,
            seconds
        );

        if !sample.outcome.is_success() {
            match self.config.crash_policy {
                CrashPolicy::Record => tracing::warn!(
                    "Test {} ({}) with arguments {:?} {}; keeping {:.6}s",
                    descriptor.test_id,
                    descriptor.variant,
                    arguments,
                    sample.outcome,
                    seconds
                ),
                CrashPolicy::Fail => {
                    return Err(SweepError::InvocationFailed {
                        test_id: descriptor.test_id,
                        variant: descriptor.variant,
                        arguments: sample.arguments,
                        outcome: sample.outcome,
                    })
                }
            }
        }
        Ok(seconds)
    }
}

/// Sweep engine
///
/// Consults the handler registry first; overridden tests never reach the
/// generic sweep.
pub struct SweepEngine<'a> {
    ctx: SweepContext<'a>,
    registry: &'a HandlerRegistry,
}

impl<'a> SweepEngine<'a> {
    /// Create a new sweep engine
    pub fn new(
        config: &'a DriverConfig,
        catalog: &'a Catalog,
        registry: &'a HandlerRegistry,
        invoker: &'a dyn Invoker,
    ) -> Self {
        Self {
            ctx: SweepContext::new(config, catalog, invoker),
            registry,
        }
    }

    /// Shared sweep context
    pub fn context(&self) -> &SweepContext<'a> {
        &self.ctx
    }

    /// Handler registry consulted before the generic sweep
    pub fn registry(&self) -> &'a HandlerRegistry {
        self.registry
    }

    /// Sweep one variant of a test
    ///
    /// # Errors
    /// Returns `SweepError` if the executable cannot be resolved or started,
    /// or if a crash is rejected by the crash policy.
    pub async fn sweep(
        &self,
        test_id: TestId,
        variant: Variant,
    ) -> Result<SweepOutcome, SweepError> {
        if let Some(OverrideOutcome::Result(outcome)) = self
            .registry
            .invoke_override(test_id, variant, OverrideMode::Execute, &self.ctx)
            .await?
        {
            return Ok(outcome);
        }

        let descriptor = self.ctx.resolve(test_id, variant)?;
        let base = self.sweep_base_grid(descriptor).await?;

        let config = self.ctx.config();
        let extendable = descriptor.arg_count != ArgCount::Zero
            && config.adaptive_extension
            && base
                .result
                .last_latency()
                .is_some_and(|seconds| config.under_budget(seconds));
        if extendable {
            tracing::debug!("Test {test_id} ({variant}) under budget at grid edge, extending");
            extension::extend(&self.ctx, descriptor, base).await
        } else {
            Ok(base)
        }
    }

    /// Sweep the base grid of `descriptor` without extension
    pub async fn sweep_base_grid(
        &self,
        descriptor: &BenchmarkDescriptor,
    ) -> Result<SweepOutcome, SweepError> {
        let grid = self.ctx.config().base_grid(descriptor.arg_count);
        let result = match &grid {
            ArgumentGrid::NoArguments => {
                tracing::info!("{}", descriptor.path.display());
                SweepResult::Scalar(self.ctx.measure(descriptor, &[]).await?)
            }
            ArgumentGrid::Linear { values } => {
                let mut latencies = Vec::with_capacity(values.len());
                for &value in values {
                    latencies.push(self.ctx.measure(descriptor, &[value]).await?);
                }
                SweepResult::Series(latencies)
            }
            ArgumentGrid::Rect { outer, inner } => {
                let mut rows = Vec::with_capacity(outer.len());
                for &threads in outer {
                    let mut row = Vec::with_capacity(inner.len());
                    for &yields in inner {
                        row.push(self.ctx.measure(descriptor, &[threads, yields]).await?);
                    }
                    rows.push(row);
                }
                SweepResult::Matrix(rows)
            }
        };
        Ok(SweepOutcome { result, grid })
    }
}
