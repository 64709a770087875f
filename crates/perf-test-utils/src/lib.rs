//! Testing utilities for the perf-driver workspace
//!
//! Scripted invokers, fixture catalogs, and configuration presets.

#![allow(missing_docs)]

use parking_lot::Mutex;
use perf_driver::catalog::{Catalog, ExecutableSets};
use perf_driver::config::DriverConfig;
use perf_driver::error::InvokeError;
use perf_driver::invoker::Invoker;
use perf_driver::types::{ExecutionSample, Outcome, Variant};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a scripted invocation reports
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Response {
    /// A completed run
    Sample { seconds: f64, outcome: Outcome },
    /// The executable could not be started
    SpawnFailure,
}

impl Response {
    pub fn ok(seconds: f64) -> Self {
        Self::Sample {
            seconds,
            outcome: Outcome::Exited { code: 0 },
        }
    }

    pub fn exited(seconds: f64, code: i32) -> Self {
        Self::Sample {
            seconds,
            outcome: Outcome::Exited { code },
        }
    }

    pub fn signalled(seconds: f64) -> Self {
        Self::Sample {
            seconds,
            outcome: Outcome::Signalled,
        }
    }
}

type Script = dyn Fn(&Path, &[u64]) -> Response + Send + Sync;

/// Invoker answering from a closure instead of spawning processes
///
/// Every call is recorded in order.
pub struct ScriptedInvoker {
    script: Box<Script>,
    calls: Mutex<Vec<(PathBuf, Vec<u64>)>>,
}

impl ScriptedInvoker {
    pub fn new(script: impl Fn(&Path, &[u64]) -> Response + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every run takes `seconds`
    pub fn constant(seconds: f64) -> Self {
        Self::new(move |_, _| Response::ok(seconds))
    }

    /// Latency computed from the arguments alone
    pub fn by_arguments(latency: impl Fn(&[u64]) -> f64 + Send + Sync + 'static) -> Self {
        Self::new(move |_, arguments| Response::ok(latency(arguments)))
    }

    /// All recorded (path, arguments) pairs
    pub fn calls(&self) -> Vec<(PathBuf, Vec<u64>)> {
        self.calls.lock().clone()
    }

    /// Arguments of the calls made for `variant`, in order
    pub fn arguments_for(&self, variant: Variant) -> Vec<Vec<u64>> {
        self.calls
            .lock()
            .iter()
            .filter(|(path, _)| variant_of(path) == variant)
            .map(|(_, arguments)| arguments.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait::async_trait]
impl Invoker for ScriptedInvoker {
    async fn invoke(&self, path: &Path, arguments: &[u64]) -> Result<ExecutionSample, InvokeError> {
        self.calls.lock().push((path.to_path_buf(), arguments.to_vec()));
        match (self.script)(path, arguments) {
            Response::Sample { seconds, outcome } => Ok(ExecutionSample {
                arguments: arguments.to_vec(),
                elapsed: Duration::from_secs_f64(seconds),
                outcome,
            }),
            Response::SpawnFailure => Err(InvokeError::Spawn {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "scripted spawn failure"),
            }),
        }
    }
}

/// Variant a fixture path belongs to, judged by its parent directory
pub fn variant_of(path: &Path) -> Variant {
    let parent = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str());
    match parent {
        Some("pthreads") => Variant::ThreadLibrary,
        Some("stack") => Variant::StackOverflowHandling,
        _ => Variant::Baseline,
    }
}

/// Baseline file names of the fixture suite
pub const FIXTURE_TESTS: [&str; 7] = [
    "01-main",
    "12-join",
    "21-create-many",
    "31-yield-many",
    "51-fibonacci",
    "71-switch-many",
    "81-deep-recursion",
];

/// Executable sets of the fixture suite under `bin/`
///
/// Each variant directory holds one executable per baseline test, named
/// with a one-letter prefix.
pub fn fixture_sets() -> ExecutableSets {
    let root = PathBuf::from("bin");
    let named = |dir: &Path, prefix: &str| -> Vec<PathBuf> {
        FIXTURE_TESTS
            .iter()
            .map(|name| dir.join(format!("{prefix}{name}")))
            .collect()
    };
    ExecutableSets {
        baseline: named(&root, ""),
        thread_library: Some(named(&root.join("pthreads"), "p")),
        stack_overflow_handling: Some(named(&root.join("stack"), "s")),
    }
}

/// Catalog built from [`fixture_sets`]
pub fn fixture_catalog(config: &DriverConfig) -> Catalog {
    Catalog::from_sets(fixture_sets(), config).expect("fixture catalog is consistent")
}

/// Create the fixture suite as empty files under `root`
pub fn write_install_tree(root: &Path) -> io::Result<()> {
    for dir in ["pthreads", "stack"] {
        std::fs::create_dir_all(root.join(dir))?;
    }
    for name in FIXTURE_TESTS {
        std::fs::write(root.join(name), b"")?;
        std::fs::write(root.join("pthreads").join(format!("p{name}")), b"")?;
        std::fs::write(root.join("stack").join(format!("s{name}")), b"")?;
    }
    Ok(())
}

/// Default configuration without the pause between tests and with a
/// short no-argument average
pub fn test_config() -> DriverConfig {
    DriverConfig::default()
        .with_settle_delay(Duration::ZERO)
        .with_no_arg_iterations(3)
}
