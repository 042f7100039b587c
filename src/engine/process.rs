//! Blocking engine invocation with a deadline.

use std::fs::{self, File};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::workspace::Workspace;
use crate::error::HarnessError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of one engine step.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stderr followed by stdout, for diagnostics that may land on either.
    pub fn combined(&self) -> String {
        match (self.stderr.trim().is_empty(), self.stdout.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stderr.trim_end(), self.stdout.trim_end()),
            (false, true) => self.stderr.trim_end().to_string(),
            (true, _) => self.stdout.trim_end().to_string(),
        }
    }
}

/// Run `command` to completion, killing it once `timeout` elapses.
///
/// Output is captured into files under the workspace so a chatty child can
/// never block on a full pipe while we poll.
pub fn run_with_timeout(
    mut command: Command,
    step: &str,
    workspace: &Workspace,
    timeout: Duration,
) -> Result<ProcessOutput, HarnessError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let stdout_path = workspace.capture_file(step, "stdout");
    let stderr_path = workspace.capture_file(step, "stderr");
    let stdout_file = File::create(&stdout_path)?;
    let stderr_file = File::create(&stderr_path)?;

    command
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file));

    debug!(step, program = %program, "spawning engine step");
    let mut child = command.spawn().map_err(|err| HarnessError::EngineSpawn {
        program: program.clone(),
        reason: err.to_string(),
    })?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if started.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    let timeout_ms = timeout.as_millis() as u64;
                    warn!(step, timeout_ms, "engine step timed out");
                    return Err(HarnessError::Timeout {
                        step: step.to_string(),
                        timeout_ms,
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                return Err(HarnessError::EngineSpawn {
                    program,
                    reason: format!("waiting for process failed: {err}"),
                })
            }
        }
    };

    let output = ProcessOutput {
        exit_code: status.code(),
        stdout: read_lossy(&stdout_path)?,
        stderr: read_lossy(&stderr_path)?,
    };
    debug!(
        step,
        exit_code = ?output.exit_code,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "engine step finished"
    );
    Ok(output)
}

fn read_lossy(path: &std::path::Path) -> Result<String, HarnessError> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
