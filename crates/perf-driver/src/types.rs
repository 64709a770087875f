use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Numeric benchmark identifier embedded in executable file names
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(pub u16);

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// Build variant of a benchmark executable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Built against the user-space thread library
    Baseline,
    /// Built against the system thread library
    ThreadLibrary,
    /// Built with stack overflow handling enabled
    StackOverflowHandling,
}

impl Variant {
    /// All variants, in run order
    pub const ALL: [Variant; 3] = [
        Variant::Baseline,
        Variant::ThreadLibrary,
        Variant::StackOverflowHandling,
    ];

    /// Subdirectory of the install directory holding this variant
    pub fn subdirectory(self) -> Option<&'static str> {
        match self {
            Variant::Baseline => None,
            Variant::ThreadLibrary => Some("pthreads"),
            Variant::StackOverflowHandling => Some("stack"),
        }
    }

    /// Build command producing this variant's executables
    pub fn build_hint(self) -> &'static str {
        match self {
            Variant::Baseline => "make install",
            Variant::ThreadLibrary => "make pthreads",
            Variant::StackOverflowHandling => "make stack",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variant::Baseline => "baseline",
            Variant::ThreadLibrary => "thread-library",
            Variant::StackOverflowHandling => "stack-overflow-handling",
        };
        f.write_str(name)
    }
}

/// Number of positional integer arguments a benchmark takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgCount {
    /// No arguments
    Zero,
    /// One swept argument (thread count)
    One,
    /// Two swept arguments (thread count, yield count)
    Two,
}

impl ArgCount {
    /// Argument count as a number
    pub fn as_usize(self) -> usize {
        match self {
            ArgCount::Zero => 0,
            ArgCount::One => 1,
            ArgCount::Two => 2,
        }
    }
}

/// One cataloged benchmark executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkDescriptor {
    pub test_id: TestId,
    pub variant: Variant,
    pub arg_count: ArgCount,
    pub path: PathBuf,
}

/// Argument values swept by a benchmark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgumentGrid {
    /// Benchmark takes no arguments
    NoArguments,
    /// Values of the single argument, in sweep order
    Linear { values: Vec<u64> },
    /// Rectangular grid: one row per outer value, one column per inner value
    Rect { outer: Vec<u64>, inner: Vec<u64> },
}

impl ArgumentGrid {
    /// Number of grid points
    pub fn len(&self) -> usize {
        match self {
            ArgumentGrid::NoArguments => 1,
            ArgumentGrid::Linear { values } => values.len(),
            ArgumentGrid::Rect { outer, inner } => outer.len() * inner.len(),
        }
    }

    /// Check if the grid has no points to sweep
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How a benchmark process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Process exited with a status code
    Exited { code: i32 },
    /// Process was terminated by a signal
    Signalled,
}

impl Outcome {
    /// Check if the process ran to a zero exit status
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Exited { code: 0 })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Exited { code } => write!(f, "exited with status {code}"),
            Outcome::Signalled => f.write_str("terminated by signal"),
        }
    }
}

/// One timed invocation of a benchmark executable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSample {
    pub arguments: Vec<u64>,
    pub elapsed: Duration,
    pub outcome: Outcome,
}

impl ExecutionSample {
    /// Wall-clock latency in seconds
    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Latencies of one sweep, one per grid point, in grid order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SweepResult {
    /// No-argument benchmark
    Scalar(f64),
    /// One-argument benchmark
    Series(Vec<f64>),
    /// Two-argument benchmark, one row per outer value
    Matrix(Vec<Vec<f64>>),
}

impl SweepResult {
    /// Number of dimensions (0, 1 or 2)
    pub fn rank(&self) -> usize {
        match self {
            SweepResult::Scalar(_) => 0,
            SweepResult::Series(_) => 1,
            SweepResult::Matrix(_) => 2,
        }
    }

    /// Shape as (rows, columns); scalars are (1, 1) and series (1, len)
    ///
    /// Matrix columns are read from the first row.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            SweepResult::Scalar(_) => (1, 1),
            SweepResult::Series(values) => (1, values.len()),
            SweepResult::Matrix(rows) => (rows.len(), rows.first().map_or(0, Vec::len)),
        }
    }

    /// Total number of latency samples
    pub fn sample_count(&self) -> usize {
        match self {
            SweepResult::Scalar(_) => 1,
            SweepResult::Series(values) => values.len(),
            SweepResult::Matrix(rows) => rows.iter().map(Vec::len).sum(),
        }
    }

    /// Latency at the lexicographically last grid point
    pub fn last_latency(&self) -> Option<f64> {
        match self {
            SweepResult::Scalar(value) => Some(*value),
            SweepResult::Series(values) => values.last().copied(),
            SweepResult::Matrix(rows) => rows.last().and_then(|row| row.last()).copied(),
        }
    }
}

/// Result of a sweep together with the grid that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub result: SweepResult,
    pub grid: ArgumentGrid,
}
