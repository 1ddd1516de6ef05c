//! Helpers for running child processes with timeouts and bounded output.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Captured output of a child that exited on its own.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
}

impl ProcessOutput {
    /// Stdout as text, with a notice when the capture limit cut it short.
    pub fn stdout_text(&self) -> String {
        decode_bounded(&self.stdout, self.stdout_truncated, "stdout")
    }

    /// Stderr as text, with a notice when the capture limit cut it short.
    pub fn stderr_text(&self) -> String {
        decode_bounded(&self.stderr, self.stderr_truncated, "stderr")
    }
}

/// How a child process ended.
#[derive(Debug)]
pub enum ProcessOutcome {
    Exited(ProcessOutput),
    /// The deadline passed before the child exited and closed its output pipes.
    /// The child is killed and its output discarded.
    TimedOut,
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

type Capture = (Vec<u8>, usize);

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe).
///
/// `timeout` covers both the child and the draining of its pipes. Background processes started
/// by a shell inherit the pipes; if they still hold them open at the deadline the outcome is
/// [`ProcessOutcome::TimedOut`]. The reader threads are then left to finish on their own.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<ProcessOutcome> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let deadline = Instant::now() + timeout;
    let mut child = cmd.spawn().context("spawn command")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let (tx, rx) = mpsc::channel();
    spawn_reader(Stream::Stdout, stdout, output_limit_bytes, tx.clone());
    spawn_reader(Stream::Stderr, stderr, output_limit_bytes, tx);

    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?;
            return Ok(ProcessOutcome::TimedOut);
        }
    };

    let mut stdout_capture: Option<Capture> = None;
    let mut stderr_capture: Option<Capture> = None;
    while stdout_capture.is_none() || stderr_capture.is_none() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((Stream::Stdout, result)) => stdout_capture = Some(result.context("read stdout")?),
            Ok((Stream::Stderr, result)) => stderr_capture = Some(result.context("read stderr")?),
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    exit_code = ?status.code(),
                    "output pipes still open at deadline, treating as timeout"
                );
                return Ok(ProcessOutcome::TimedOut);
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(anyhow!("output reader thread panicked"));
            }
        }
    }
    let (stdout, stdout_truncated) = stdout_capture.unwrap_or_default();
    let (stderr, stderr_truncated) = stderr_capture.unwrap_or_default();

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), "command finished");
    Ok(ProcessOutcome::Exited(ProcessOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
    }))
}

fn spawn_reader<R: Read + Send + 'static>(
    stream: Stream,
    reader: R,
    limit: usize,
    tx: Sender<(Stream, Result<Capture>)>,
) {
    thread::spawn(move || {
        // The receiver is gone once the deadline has passed.
        let _ = tx.send((stream, read_stream_limited(reader, limit)));
    });
}

/// Decode lossily, dropping a multi-byte character split by the capture limit.
fn decode_bounded(bytes: &[u8], truncated: usize, label: &str) -> String {
    if truncated == 0 {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    // An incomplete sequence at the end counts as truncated too.
    let end = match std::str::from_utf8(bytes) {
        Err(err) if err.error_len().is_none() => err.valid_up_to(),
        _ => bytes.len(),
    };
    let omitted = truncated + (bytes.len() - end);
    let mut text = String::from_utf8_lossy(&bytes[..end]).into_owned();
    text.push_str(&format!("\n[{label} truncated {omitted} bytes]\n"));
    text
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<Capture> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
