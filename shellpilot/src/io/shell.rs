//! Command runner abstraction for shell execution.
//!
//! The [`CommandRunner`] trait decouples the conversation loop from the host
//! shell. Tests use scripted runners that return predetermined results without
//! spawning processes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument};

use crate::core::types::{CapturedOutput, ExecutionResult};
use crate::error::ExecutionError;
use crate::io::process::{ProcessOutcome, run_command_with_timeout};

/// Abstraction over shell execution backends.
pub trait CommandRunner {
    /// Run one command string. Timeouts are a result, not an error.
    fn run(&self, command: &str) -> Result<ExecutionResult>;
}

/// Runner that hands each command to a shell program (`sh -c <command>` by default).
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    /// Shell program followed by its arguments; the command is appended last.
    shell: Vec<String>,
    /// Working directory for spawned commands. Inherits the process cwd when `None`.
    workdir: Option<PathBuf>,
    timeout: Duration,
    capture_limit_bytes: usize,
}

impl ShellCommandRunner {
    pub fn new(shell: Vec<String>, timeout: Duration, capture_limit_bytes: usize) -> Self {
        Self {
            shell,
            workdir: None,
            timeout,
            capture_limit_bytes,
        }
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    fn build(&self, command: &str) -> Result<Command> {
        let (program, args) = self
            .shell
            .split_first()
            .ok_or_else(|| anyhow!("shell must name a program"))?;
        let mut cmd = Command::new(program);
        cmd.args(args).arg(command);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        Ok(cmd)
    }
}

impl CommandRunner for ShellCommandRunner {
    #[instrument(skip_all, fields(timeout_secs = self.timeout.as_secs()))]
    fn run(&self, command: &str) -> Result<ExecutionResult> {
        debug!(command, "spawning shell");
        let outcome =
            run_command_with_timeout(self.build(command)?, self.timeout, self.capture_limit_bytes)
                .map_err(|err| execution_error(command, err))?;

        match outcome {
            ProcessOutcome::TimedOut => {
                info!(command, "command timed out, skipping");
                Ok(ExecutionResult::TimedOut)
            }
            ProcessOutcome::Exited(output) => {
                debug!(exit_code = ?output.status.code(), "command exited");
                Ok(ExecutionResult::Completed(CapturedOutput {
                    stdout: output.stdout_text(),
                    stderr: output.stderr_text(),
                    exit_code: output.status.code(),
                }))
            }
        }
    }
}

/// Default shell invocation for the host platform.
pub fn default_shell() -> Vec<String> {
    if cfg!(windows) {
        vec!["powershell".to_string(), "-Command".to_string()]
    } else {
        vec!["sh".to_string(), "-c".to_string()]
    }
}

/// Convert a process failure into an [`ExecutionError`], keeping the I/O cause when present.
fn execution_error(command: &str, err: anyhow::Error) -> anyhow::Error {
    let source = match err.downcast::<std::io::Error>() {
        Ok(io_err) => io_err,
        Err(other) => std::io::Error::other(format!("{other:#}")),
    };
    ExecutionError {
        command: command.to_string(),
        source,
    }
    .into()
}
