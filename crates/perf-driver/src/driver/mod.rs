//! Driver
//!
//! Runs tests one after another. Each test sweeps the baseline first, then
//! each variant, and aligns every variant result to the baseline. A failed
//! or malformed variant is recorded on the test's report and never stops
//! the run.

use crate::engine::SweepEngine;
use crate::error::SweepError;
use crate::reconcile::{reconcile, Reconciliation};
use crate::registry::{OverrideMode, OverrideOutcome};
use crate::report::{FaultKind, RunReport, TestReport, VariantFault};
use crate::types::{ArgumentGrid, SweepOutcome, SweepResult, TestId, Variant};
use chrono::Utc;

/// Sequential benchmark driver
pub struct Driver<'a> {
    engine: SweepEngine<'a>,
    catalog_ids: Vec<TestId>,
}

impl<'a> Driver<'a> {
    /// Create a driver over the tests of the engine's catalog
    pub fn new(engine: SweepEngine<'a>, catalog_ids: Vec<TestId>) -> Self {
        Self {
            engine,
            catalog_ids,
        }
    }

    /// Sweep engine used for every test
    pub fn engine(&self) -> &SweepEngine<'a> {
        &self.engine
    }

    /// Run every cataloged test except the configured exclusions
    pub async fn run_all(&self) -> RunReport {
        let excluded = &self.engine.context().config().excluded_tests;
        let (selected, skipped): (Vec<TestId>, Vec<TestId>) = self
            .catalog_ids
            .iter()
            .copied()
            .partition(|test_id| !excluded.contains(test_id));
        self.run(selected, skipped).await
    }

    /// Run only the given tests, in catalog order
    ///
    /// Requested tests missing from the catalog are logged and skipped.
    pub async fn run_selected(&self, tests: &[TestId]) -> RunReport {
        for test_id in tests {
            if !self.catalog_ids.contains(test_id) {
                tracing::warn!("Test {test_id} is not cataloged, skipping");
            }
        }
        let (selected, skipped): (Vec<TestId>, Vec<TestId>) = self
            .catalog_ids
            .iter()
            .copied()
            .partition(|test_id| tests.contains(test_id));
        self.run(selected, skipped).await
    }

    async fn run(&self, selected: Vec<TestId>, skipped: Vec<TestId>) -> RunReport {
        let settle_delay = self.engine.context().config().settle_delay();
        let started_at = Utc::now();
        tracing::info!("Running {} tests, skipping {}", selected.len(), skipped.len());

        let mut tests = Vec::with_capacity(selected.len());
        for test_id in selected {
            if !settle_delay.is_zero() {
                tokio::time::sleep(settle_delay).await;
            }
            tests.push(self.run_test(test_id).await);
        }

        RunReport {
            started_at,
            finished_at: Utc::now(),
            skipped,
            tests,
        }
    }

    /// Sweep one test across all variants and align the variants to the baseline
    pub async fn run_test(&self, test_id: TestId) -> TestReport {
        tracing::info!("Test {test_id}");
        let config = self.engine.context().config();
        let arg_count = self
            .engine
            .context()
            .resolve(test_id, Variant::Baseline)
            .map_or_else(|_| config.arg_count(test_id), |descriptor| descriptor.arg_count);

        let mut faults = Vec::new();
        let baseline = self.sweep_variant(test_id, Variant::Baseline, &mut faults).await;
        let axes = self.axes(test_id, baseline.as_ref()).await;
        let reference = baseline.map(|outcome| outcome.result);

        let thread_library = self
            .sweep_variant(test_id, Variant::ThreadLibrary, &mut faults)
            .await;
        let thread_library = align_variant(
            test_id,
            Variant::ThreadLibrary,
            reference.as_ref(),
            thread_library,
            &mut faults,
        );
        let stack = self
            .sweep_variant(test_id, Variant::StackOverflowHandling, &mut faults)
            .await;
        let stack_overflow_handling = align_variant(
            test_id,
            Variant::StackOverflowHandling,
            reference.as_ref(),
            stack,
            &mut faults,
        );

        TestReport {
            test_id,
            arg_count,
            axes,
            baseline: reference,
            thread_library,
            stack_overflow_handling,
            faults,
        }
    }

    async fn sweep_variant(
        &self,
        test_id: TestId,
        variant: Variant,
        faults: &mut Vec<VariantFault>,
    ) -> Option<SweepOutcome> {
        match self.engine.sweep(test_id, variant).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                match &e {
                    SweepError::Resolve(cause) if !cause.is_configuration_fault() => {
                        tracing::warn!("Test {test_id} ({variant}) has no sample: {e}");
                    }
                    _ => tracing::warn!("Test {test_id} ({variant}) sweep failed: {e}"),
                }
                faults.push(VariantFault {
                    variant,
                    kind: FaultKind::Sweep {
                        message: e.to_string(),
                    },
                });
                None
            }
        }
    }

    /// Argument axes for presentation: the override's grid when there is
    /// one, otherwise the grid the baseline actually swept
    async fn axes(&self, test_id: TestId, baseline: Option<&SweepOutcome>) -> ArgumentGrid {
        let ctx = self.engine.context();
        let display = self
            .engine
            .registry()
            .invoke_override(test_id, Variant::Baseline, OverrideMode::Display, ctx)
            .await;
        match (display, baseline) {
            (Ok(Some(OverrideOutcome::Grid(grid))), _) => grid,
            (_, Some(outcome)) => outcome.grid.clone(),
            (_, None) => {
                let config = ctx.config();
                config.base_grid(config.arg_count(test_id))
            }
        }
    }
}

/// Align a variant's result to the baseline, recording why if it cannot be
fn align_variant(
    test_id: TestId,
    variant: Variant,
    reference: Option<&SweepResult>,
    outcome: Option<SweepOutcome>,
    faults: &mut Vec<VariantFault>,
) -> Option<SweepResult> {
    let result = outcome?.result;
    let Some(reference) = reference else {
        faults.push(VariantFault {
            variant,
            kind: FaultKind::MissingBaseline,
        });
        return Some(result);
    };
    match reconcile(reference, result) {
        Reconciliation::Aligned(result) => Some(result),
        Reconciliation::Unaligned { result, fault } => {
            tracing::warn!("Test {test_id} ({variant}) not aligned: {fault}");
            faults.push(VariantFault {
                variant,
                kind: FaultKind::Shape { fault },
            });
            Some(result)
        }
    }
}
