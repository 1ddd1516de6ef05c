//! Test-only doubles for the chat backend, the shell and the workspace.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Context, Result, bail};
use tempfile::TempDir;

use crate::core::types::{CapturedOutput, ExecutionResult, Message};
use crate::io::chat::ChatClient;
use crate::io::shell::CommandRunner;
use crate::io::workspace::Workspace;

/// Chat client that replays canned replies in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedChat {
    replies: RefCell<VecDeque<String>>,
    requests: RefCell<Vec<Vec<Message>>>,
}

impl ScriptedChat {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: RefCell::new(replies.into_iter().map(Into::into).collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Snapshot of the history sent with each request, oldest first.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl ChatClient for ScriptedChat {
    fn complete(&self, messages: &[Message]) -> Result<String> {
        self.requests.borrow_mut().push(messages.to_vec());
        match self.replies.borrow_mut().pop_front() {
            Some(reply) => Ok(reply),
            None => bail!("scripted chat exhausted"),
        }
    }
}

/// Command runner that returns queued results without spawning anything.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    results: RefCell<VecDeque<ExecutionResult>>,
    commands: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new(results: Vec<ExecutionResult>) -> Self {
        Self {
            results: RefCell::new(results.into()),
            commands: RefCell::new(Vec::new()),
        }
    }

    /// Commands received so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str) -> Result<ExecutionResult> {
        self.commands.borrow_mut().push(command.to_string());
        match self.results.borrow_mut().pop_front() {
            Some(result) => Ok(result),
            None => bail!("scripted runner exhausted"),
        }
    }
}

/// A finished command with the given streams and exit code 0.
pub fn completed(stdout: &str, stderr: &str) -> ExecutionResult {
    ExecutionResult::Completed(CapturedOutput {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        exit_code: Some(0),
    })
}

/// Temporary base directory holding one run workspace with a fixed timestamp.
pub struct TestWorkspace {
    _temp: TempDir,
    pub workspace: Workspace,
}

impl TestWorkspace {
    pub const TIMESTAMP: &'static str = "20260101-120000";

    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let workspace = Workspace::create_named(temp.path(), Self::TIMESTAMP)?;
        Ok(Self {
            _temp: temp,
            workspace,
        })
    }

    /// Read a file under the run's `outputs/` directory.
    pub fn read_output(&self, filename: &str) -> Result<String> {
        let path = self.workspace.output_dir.join(filename);
        std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }
}
