//! Adaptive Extension
//!
//! Grows a sweep past its base grid, one step of `extension_step` at a time,
//! until a sample reaches the time budget or the next value would pass the
//! hard ceiling. Both loops check termination before issuing any sample, so
//! the number of iterations is at most
//! `(hard_ceiling - last_grid_value) / extension_step`, rounded up.

use super::SweepContext;
use crate::error::SweepError;
use crate::types::{ArgumentGrid, BenchmarkDescriptor, SweepOutcome, SweepResult};

/// First extension value after `last`: rounded down to a multiple of
/// `step`, plus `step`
///
/// Returns `None` for a zero step.
pub fn next_step(last: u64, step: u64) -> Option<u64> {
    let rounded = last - last.checked_rem(step)?;
    Some(rounded.saturating_add(step))
}

/// Extend `outcome` past its grid
///
/// Scalars, empty grids and a zero `extension_step` leave `outcome`
/// unchanged.
pub async fn extend(
    ctx: &SweepContext<'_>,
    descriptor: &BenchmarkDescriptor,
    outcome: SweepOutcome,
) -> Result<SweepOutcome, SweepError> {
    let step = ctx.config().extension_step;
    match outcome {
        SweepOutcome {
            result: SweepResult::Series(latencies),
            grid: ArgumentGrid::Linear { values },
        } => match values.last().and_then(|&last| next_step(last, step)) {
            Some(next) => extend_linear(ctx, descriptor, latencies, values, next).await,
            None => Ok(SweepOutcome {
                result: SweepResult::Series(latencies),
                grid: ArgumentGrid::Linear { values },
            }),
        },
        SweepOutcome {
            result: SweepResult::Matrix(rows),
            grid: ArgumentGrid::Rect { outer, inner },
        } => match (
            outer.last().and_then(|&last| next_step(last, step)),
            inner.last().and_then(|&last| next_step(last, step)),
        ) {
            (Some(next_thread), Some(next_yield)) => {
                extend_rect(ctx, descriptor, rows, outer, inner, next_thread, next_yield).await
            }
            _ => Ok(SweepOutcome {
                result: SweepResult::Matrix(rows),
                grid: ArgumentGrid::Rect { outer, inner },
            }),
        },
        other => Ok(other),
    }
}

/// Extend a one-argument sweep starting at `next`
///
/// Appends one sample per step. Stops after the first sample at or above
/// the budget, or before any value above the ceiling.
pub async fn extend_linear(
    ctx: &SweepContext<'_>,
    descriptor: &BenchmarkDescriptor,
    mut latencies: Vec<f64>,
    mut values: Vec<u64>,
    mut next: u64,
) -> Result<SweepOutcome, SweepError> {
    let config = ctx.config();
    while next <= config.hard_ceiling {
        let seconds = ctx.measure(descriptor, &[next]).await?;
        latencies.push(seconds);
        values.push(next);
        if !config.under_budget(seconds) {
            tracing::debug!("Test {} exceeded budget at {next}", descriptor.test_id);
            break;
        }
        match next.checked_add(config.extension_step) {
            Some(value) if value > next => next = value,
            _ => break,
        }
    }
    Ok(SweepOutcome {
        result: SweepResult::Series(latencies),
        grid: ArgumentGrid::Linear { values },
    })
}

/// Extend a two-argument sweep by one row and one column per step
///
/// Each step first measures the new yield value against every known thread
/// value (a new column), then the new thread value against every known
/// yield value plus the new one (a new row). Stops when the sample at
/// (`next_thread`, `next_yield`) reaches the budget, or before the two new
/// values together would pass the ceiling.
pub async fn extend_rect(
    ctx: &SweepContext<'_>,
    descriptor: &BenchmarkDescriptor,
    mut rows: Vec<Vec<f64>>,
    mut outer: Vec<u64>,
    mut inner: Vec<u64>,
    mut next_thread: u64,
    mut next_yield: u64,
) -> Result<SweepOutcome, SweepError> {
    let config = ctx.config();
    let step = config.extension_step;
    while next_thread <= config.hard_ceiling
        && next_thread.saturating_add(next_yield) <= config.hard_ceiling
    {
        for (row, &threads) in rows.iter_mut().zip(&outer) {
            row.push(ctx.measure(descriptor, &[threads, next_yield]).await?);
        }

        let mut new_row = Vec::with_capacity(inner.len() + 1);
        for &yields in inner.iter().chain(std::iter::once(&next_yield)) {
            new_row.push(ctx.measure(descriptor, &[next_thread, yields]).await?);
        }
        let corner = new_row.last().copied().unwrap_or_default();
        rows.push(new_row);
        outer.push(next_thread);
        inner.push(next_yield);

        if !config.under_budget(corner) {
            tracing::debug!(
                "Test {} exceeded budget at ({next_thread}, {next_yield})",
                descriptor.test_id
            );
            break;
        }
        match (next_thread.checked_add(step), next_yield.checked_add(step)) {
            (Some(threads), Some(yields)) if threads > next_thread => {
                next_thread = threads;
                next_yield = yields;
            }
            _ => break,
        }
    }
    Ok(SweepOutcome {
        result: SweepResult::Matrix(rows),
        grid: ArgumentGrid::Rect { outer, inner },
    })
}
