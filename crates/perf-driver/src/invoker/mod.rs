//! Benchmark invocation
//!
//! The sweep engine never spawns processes itself. It asks an [`Invoker`]
//! for one timed run at a time and awaits it before issuing the next, so
//! every sample measures an uncontended machine.

use crate::error::InvokeError;
use crate::types::{ExecutionSample, Outcome};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;

/// Runs one benchmark executable and reports its wall-clock latency
///
/// Implement this trait to substitute how executables are run, for
/// example with a scripted fake in tests.
#[async_trait::async_trait]
pub trait Invoker: Send + Sync {
    /// Run `path` with `arguments` to completion
    async fn invoke(&self, path: &Path, arguments: &[u64]) -> Result<ExecutionSample, InvokeError>;
}

/// Invoker spawning real processes
///
/// Benchmark stdout is sent to the driver's stderr, keeping the driver's
/// stdout for the report. There is no timeout: a hung benchmark blocks the
/// driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessInvoker;

impl ProcessInvoker {
    /// Create a new process invoker
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Invoker for ProcessInvoker {
    async fn invoke(&self, path: &Path, arguments: &[u64]) -> Result<ExecutionSample, InvokeError> {
        let mut command = tokio::process::Command::new(path);
        command
            .args(arguments.iter().map(u64::to_string))
            .stdin(Stdio::null())
            .stdout(std::io::stderr())
            .kill_on_drop(true);

        let start = Instant::now();
        let status = command.status().await.map_err(|source| InvokeError::Spawn {
            path: path.to_path_buf(),
            source,
        })?;
        let elapsed = start.elapsed();

        Ok(ExecutionSample {
            arguments: arguments.to_vec(),
            elapsed,
            outcome: outcome_of(status),
        })
    }
}

fn outcome_of(status: ExitStatus) -> Outcome {
    match status.code() {
        Some(code) => Outcome::Exited { code },
        None => Outcome::Signalled,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn times_a_real_process() {
        let sample = ProcessInvoker::new()
            .invoke(Path::new("/bin/sh"), &[])
            .await
            .unwrap();
        assert_eq!(sample.outcome, Outcome::Exited { code: 0 });
        assert!(sample.arguments.is_empty());
    }

    #[tokio::test]
    async fn non_zero_exit_is_still_a_sample() {
        let sample = ProcessInvoker::new()
            .invoke(Path::new("/bin/false"), &[3])
            .await
            .unwrap();
        assert_eq!(sample.arguments, vec![3]);
        assert!(!sample.outcome.is_success());
    }

    #[tokio::test]
    async fn missing_executable_fails_to_spawn() {
        let err = ProcessInvoker::new()
            .invoke(Path::new("/nonexistent/21-create-many"), &[1])
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Spawn { .. }));
    }
}
