//! Driver configuration
//!
//! Built once at startup and passed by reference to the resolver, the
//! sweep engine and the driver. Nothing mutates it afterwards.

use crate::error::ConfigError;
use crate::types::{ArgCount, ArgumentGrid, TestId, Variant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// What to do with a benchmark that does not exit cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrashPolicy {
    /// Keep the elapsed time as a sample and log the outcome
    #[default]
    Record,
    /// Abort the variant's sweep
    Fail,
}

/// Position of the numeric test ID inside an executable file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingScheme {
    /// Byte offset of the first ID digit
    pub id_offset: usize,
    /// Number of ID digits
    pub id_width: usize,
}

impl NamingScheme {
    /// Scheme with the ID at `id_offset`, two digits wide
    #[must_use]
    pub const fn at(id_offset: usize) -> Self {
        Self {
            id_offset,
            id_width: 2,
        }
    }

    /// Extract the test ID from a file name
    pub fn extract(&self, file_name: &str) -> Option<TestId> {
        let end = self.id_offset.checked_add(self.id_width)?;
        let digits = file_name.get(self.id_offset..end)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(TestId)
    }
}

/// File naming schemes of the three executable sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Naming {
    pub baseline: NamingScheme,
    pub thread_library: NamingScheme,
    pub stack_overflow_handling: NamingScheme,
}

impl Naming {
    /// Scheme used by `variant`
    pub fn scheme(&self, variant: Variant) -> NamingScheme {
        match variant {
            Variant::Baseline => self.baseline,
            Variant::ThreadLibrary => self.thread_library,
            Variant::StackOverflowHandling => self.stack_overflow_handling,
        }
    }
}

impl Default for Naming {
    fn default() -> Self {
        Self {
            baseline: NamingScheme::at(0),
            thread_library: NamingScheme::at(1),
            stack_overflow_handling: NamingScheme::at(1),
        }
    }
}

/// Driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Values of the first argument (thread count)
    pub thread_grid: Vec<u64>,
    /// Values of the second argument (yield count)
    pub yield_grid: Vec<u64>,
    /// Latency in seconds at which adaptive extension stops
    pub time_budget_secs: f64,
    /// Largest argument value adaptive extension may reach
    pub hard_ceiling: u64,
    /// Distance between successive extension values
    pub extension_step: u64,
    /// Pause between two tests, in milliseconds
    pub settle_delay_ms: u64,
    /// Runs averaged for each no-argument benchmark
    pub no_arg_iterations: u32,
    /// Extend sweeps past the base grid while under budget
    pub adaptive_extension: bool,
    /// Tests skipped by a full run
    pub excluded_tests: BTreeSet<TestId>,
    /// Tests taking a thread count
    pub one_arg_tests: BTreeSet<TestId>,
    /// Tests taking a thread count and a yield count
    pub two_arg_tests: BTreeSet<TestId>,
    /// Handling of benchmarks that crash or exit non-zero
    pub crash_policy: CrashPolicy,
    /// Where test IDs sit in executable names
    pub naming: Naming,
}

fn ids(values: &[u16]) -> BTreeSet<TestId> {
    values.iter().copied().map(TestId).collect()
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            thread_grid: vec![1, 2, 5, 10, 20, 50, 100, 500],
            yield_grid: vec![1, 2, 5, 10, 20, 50, 100, 500],
            time_budget_secs: 1.0,
            hard_ceiling: 10_000,
            extension_step: 1_000,
            settle_delay_ms: 1_000,
            no_arg_iterations: 100,
            adaptive_extension: true,
            excluded_tests: ids(&[41, 63, 64, 65, 71, 81, 91, 92]),
            one_arg_tests: ids(&[21, 22, 23, 51, 61, 62, 71]),
            two_arg_tests: ids(&[31, 32, 33]),
            crash_policy: CrashPolicy::Record,
            naming: Naming::default(),
        }
    }
}

impl DriverConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// With time budget in seconds
    #[inline]
    #[must_use]
    pub fn with_time_budget(mut self, secs: f64) -> Self {
        self.time_budget_secs = secs;
        self
    }

    /// With thread and yield grids
    #[must_use]
    pub fn with_grids(mut self, threads: Vec<u64>, yields: Vec<u64>) -> Self {
        self.thread_grid = threads;
        self.yield_grid = yields;
        self
    }

    /// With adaptive extension enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_adaptive_extension(mut self, enabled: bool) -> Self {
        self.adaptive_extension = enabled;
        self
    }

    /// With settle delay between tests
    #[inline]
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With iteration count for no-argument tests
    #[inline]
    #[must_use]
    pub fn with_no_arg_iterations(mut self, iterations: u32) -> Self {
        self.no_arg_iterations = iterations;
        self
    }

    /// With crash policy
    #[inline]
    #[must_use]
    pub fn with_crash_policy(mut self, policy: CrashPolicy) -> Self {
        self.crash_policy = policy;
        self
    }

    /// With additional excluded tests
    #[must_use]
    pub fn excluding(mut self, tests: impl IntoIterator<Item = TestId>) -> Self {
        self.excluded_tests.extend(tests);
        self
    }

    /// Check the configuration for values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_grid.is_empty() {
            return Err(ConfigError::EmptyGrid("thread_grid"));
        }
        if self.yield_grid.is_empty() {
            return Err(ConfigError::EmptyGrid("yield_grid"));
        }
        if self.extension_step == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if !(self.time_budget_secs.is_finite() && self.time_budget_secs > 0.0) {
            return Err(ConfigError::InvalidBudget(self.time_budget_secs));
        }
        if self.no_arg_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if let Some(id) = self.one_arg_tests.intersection(&self.two_arg_tests).next() {
            return Err(ConfigError::ConflictingArgCount(*id));
        }
        Ok(())
    }

    /// Pause between tests
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Number of arguments `test_id` takes
    pub fn arg_count(&self, test_id: TestId) -> ArgCount {
        if self.two_arg_tests.contains(&test_id) {
            ArgCount::Two
        } else if self.one_arg_tests.contains(&test_id) {
            ArgCount::One
        } else {
            ArgCount::Zero
        }
    }

    /// Base grid for tests taking `arg_count` arguments
    pub fn base_grid(&self, arg_count: ArgCount) -> ArgumentGrid {
        match arg_count {
            ArgCount::Zero => ArgumentGrid::NoArguments,
            ArgCount::One => ArgumentGrid::Linear {
                values: self.thread_grid.clone(),
            },
            ArgCount::Two => ArgumentGrid::Rect {
                outer: self.thread_grid.clone(),
                inner: self.yield_grid.clone(),
            },
        }
    }

    /// Check if a latency is still under the time budget
    pub fn under_budget(&self, seconds: f64) -> bool {
        seconds < self.time_budget_secs
    }
}
