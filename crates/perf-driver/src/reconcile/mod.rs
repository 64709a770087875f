//! Result Reconciliation
//!
//! Variants extend their sweeps independently, so their results may be
//! longer or shorter than the baseline's. Reconciliation forces a variant
//! result into the baseline's shape: short axes repeat their last entry,
//! long axes are truncated. Malformed input is handed back unchanged with
//! the reason, never raised.

use crate::types::SweepResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a result could not be aligned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeFault {
    /// The reference has no samples
    EmptyReference,
    /// The result to align has no samples
    EmptyInput,
    /// Reference rows differ in length
    RaggedReference,
    /// Rows of the result to align differ in length
    RaggedInput,
    /// The two results have different ranks
    RankMismatch {
        /// Rank of the reference
        reference: usize,
        /// Rank of the result to align
        input: usize,
    },
}

impl fmt::Display for ShapeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeFault::EmptyReference => f.write_str("reference result is empty"),
            ShapeFault::EmptyInput => f.write_str("result to align is empty"),
            ShapeFault::RaggedReference => f.write_str("reference rows differ in length"),
            ShapeFault::RaggedInput => f.write_str("rows to align differ in length"),
            ShapeFault::RankMismatch { reference, input } => {
                write!(f, "rank {input} cannot be aligned to rank {reference}")
            }
        }
    }
}

/// Outcome of reconciling one result against a reference
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Result now has the reference's shape
    Aligned(SweepResult),
    /// Result could not be aligned and is returned as given
    Unaligned {
        /// The untouched input
        result: SweepResult,
        /// What was wrong with the shapes
        fault: ShapeFault,
    },
}

impl Reconciliation {
    /// Check if alignment succeeded
    pub fn is_aligned(&self) -> bool {
        matches!(self, Reconciliation::Aligned(_))
    }

    /// Fault that prevented alignment, if any
    pub fn fault(&self) -> Option<ShapeFault> {
        match self {
            Reconciliation::Aligned(_) => None,
            Reconciliation::Unaligned { fault, .. } => Some(*fault),
        }
    }

    /// The resulting structure, aligned or not
    pub fn into_result(self) -> SweepResult {
        match self {
            Reconciliation::Aligned(result) | Reconciliation::Unaligned { result, .. } => result,
        }
    }
}

/// Align `to_align` to the shape of `reference`
pub fn reconcile(reference: &SweepResult, to_align: SweepResult) -> Reconciliation {
    match check(reference, &to_align) {
        Ok(()) => Reconciliation::Aligned(align(reference, to_align)),
        Err(fault) => Reconciliation::Unaligned {
            result: to_align,
            fault,
        },
    }
}

fn check(reference: &SweepResult, to_align: &SweepResult) -> Result<(), ShapeFault> {
    match (reference, to_align) {
        (SweepResult::Scalar(_), SweepResult::Scalar(_)) => Ok(()),
        (SweepResult::Series(reference), SweepResult::Series(input)) => {
            if reference.is_empty() {
                Err(ShapeFault::EmptyReference)
            } else if input.is_empty() {
                Err(ShapeFault::EmptyInput)
            } else {
                Ok(())
            }
        }
        (SweepResult::Matrix(reference), SweepResult::Matrix(input)) => {
            match rectangular_width(reference) {
                None | Some(0) => return Err(ShapeFault::EmptyReference),
                Some(_) if !is_rectangular(reference) => return Err(ShapeFault::RaggedReference),
                Some(_) => {}
            }
            match rectangular_width(input) {
                None | Some(0) => Err(ShapeFault::EmptyInput),
                Some(_) if !is_rectangular(input) => Err(ShapeFault::RaggedInput),
                Some(_) => Ok(()),
            }
        }
        (reference, input) => Err(ShapeFault::RankMismatch {
            reference: reference.rank(),
            input: input.rank(),
        }),
    }
}

fn rectangular_width(rows: &[Vec<f64>]) -> Option<usize> {
    rows.first().map(Vec::len)
}

fn is_rectangular(rows: &[Vec<f64>]) -> bool {
    rows.windows(2).all(|pair| pair[0].len() == pair[1].len())
}

fn align(reference: &SweepResult, to_align: SweepResult) -> SweepResult {
    match (reference, to_align) {
        (SweepResult::Series(reference), SweepResult::Series(input)) => {
            SweepResult::Series(fit(input, reference.len()))
        }
        (SweepResult::Matrix(reference), SweepResult::Matrix(input)) => {
            let width = reference[0].len();
            let rows = input.into_iter().map(|row| fit(row, width)).collect();
            SweepResult::Matrix(fit(rows, reference.len()))
        }
        (_, input) => input,
    }
}

/// Pad `items` with copies of its last element, or truncate, to `len`
///
/// `items` must be non-empty.
fn fit<T: Clone>(mut items: Vec<T>, len: usize) -> Vec<T> {
    if let Some(last) = items.last().cloned() {
        items.resize(len, last);
    }
    items
}
