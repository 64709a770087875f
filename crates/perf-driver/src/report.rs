//! Presentation boundary
//!
//! Per-test records handed to an external plotting layer: the baseline
//! result, both variant results aligned to it, and the argument axes the
//! samples were taken at.

use crate::reconcile::ShapeFault;
use crate::types::{ArgCount, ArgumentGrid, SweepResult, TestId, Variant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Why a variant's result is missing or unaligned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FaultKind {
    /// The sweep did not complete
    Sweep { message: String },
    /// The result could not be aligned to the baseline
    Shape { fault: ShapeFault },
    /// There is no baseline result to align to
    MissingBaseline,
}

/// A problem with one variant of one test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantFault {
    pub variant: Variant,
    #[serde(flatten)]
    pub kind: FaultKind,
}

/// Results of one test across the three variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub test_id: TestId,
    pub arg_count: ArgCount,
    /// Argument values the baseline samples were taken at
    pub axes: ArgumentGrid,
    pub baseline: Option<SweepResult>,
    pub thread_library: Option<SweepResult>,
    pub stack_overflow_handling: Option<SweepResult>,
    pub faults: Vec<VariantFault>,
}

impl TestReport {
    /// Result of `variant`, if one was produced
    pub fn result(&self, variant: Variant) -> Option<&SweepResult> {
        match variant {
            Variant::Baseline => self.baseline.as_ref(),
            Variant::ThreadLibrary => self.thread_library.as_ref(),
            Variant::StackOverflowHandling => self.stack_overflow_handling.as_ref(),
        }
    }

    /// Check if every variant produced a result aligned to the baseline
    pub fn is_complete(&self) -> bool {
        self.faults.is_empty() && Variant::ALL.iter().all(|v| self.result(*v).is_some())
    }

    /// (thread, yield, seconds) points of a two-argument result, row-major
    ///
    /// Points are only produced where the axes cover the matrix.
    pub fn scatter_points(&self, variant: Variant) -> Vec<[f64; 3]> {
        let (Some(SweepResult::Matrix(rows)), ArgumentGrid::Rect { outer, inner }) =
            (self.result(variant), &self.axes)
        else {
            return Vec::new();
        };
        rows.iter()
            .zip(outer)
            .flat_map(|(row, &threads)| {
                row.iter()
                    .zip(inner)
                    .map(move |(&seconds, &yields)| [threads as f64, yields as f64, seconds])
            })
            .collect()
    }
}

/// Results of one driver run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub skipped: Vec<TestId>,
    pub tests: Vec<TestReport>,
}

impl RunReport {
    /// Check if every test completed without faults
    pub fn passed(&self) -> bool {
        self.tests.iter().all(TestReport::is_complete)
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Generate a text report
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Performance Report ===\n\n");
        let _ = writeln!(report, "Started: {}", self.started_at.to_rfc3339());
        let _ = writeln!(report, "Finished: {}", self.finished_at.to_rfc3339());
        let _ = writeln!(report, "Tests: {}", self.tests.len());
        if !self.skipped.is_empty() {
            let skipped: Vec<String> = self.skipped.iter().map(ToString::to_string).collect();
            let _ = writeln!(report, "Skipped: {}", skipped.join(", "));
        }

        for test in &self.tests {
            let _ = writeln!(
                report,
                "\nTest {} ({} argument{})",
                test.test_id,
                test.arg_count.as_usize(),
                if test.arg_count == ArgCount::One { "" } else { "s" }
            );
            match &test.axes {
                ArgumentGrid::NoArguments => {}
                ArgumentGrid::Linear { values } => {
                    let _ = writeln!(report, "  threads: {values:?}");
                }
                ArgumentGrid::Rect { outer, inner } => {
                    let _ = writeln!(report, "  threads: {outer:?}");
                    let _ = writeln!(report, "  yields:  {inner:?}");
                }
            }
            for variant in Variant::ALL {
                let _ = writeln!(
                    report,
                    "  {:<24} {}",
                    variant.to_string(),
                    summarize(test.result(variant))
                );
            }
            for fault in &test.faults {
                let _ = writeln!(report, "  ! {}: {}", fault.variant, describe(&fault.kind));
            }
        }

        report.push_str(&format!(
            "\nStatus: {}\n",
            if self.passed() { "COMPLETE" } else { "INCOMPLETE" }
        ));
        report
    }
}

fn summarize(result: Option<&SweepResult>) -> String {
    match result {
        None => "no sample".to_string(),
        Some(SweepResult::Scalar(seconds)) => format!("{seconds:.6}s"),
        Some(SweepResult::Series(values)) => format!("{}", Seconds(values)),
        Some(SweepResult::Matrix(rows)) => {
            let (width, last) = (
                rows.first().map_or(0, Vec::len),
                rows.last().and_then(|row| row.last()).copied().unwrap_or_default(),
            );
            format!("{}x{} samples, corner {last:.6}s", rows.len(), width)
        }
    }
}

fn describe(kind: &FaultKind) -> String {
    match kind {
        FaultKind::Sweep { message } => message.clone(),
        FaultKind::Shape { fault } => format!("not aligned: {fault}"),
        FaultKind::MissingBaseline => "not aligned: no baseline result".to_string(),
    }
}

struct Seconds<'a>(&'a [f64]);

impl std::fmt::Display for Seconds<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value:.4}")?;
        }
        f.write_str("]")
    }
}
