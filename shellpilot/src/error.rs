//! Typed leaf errors.
//!
//! Callers work with `anyhow::Result`; these types travel inside
//! `anyhow::Error` and can be recovered with `downcast_ref` when a caller
//! needs to tell failures apart.

use std::path::PathBuf;

use thiserror::Error;

/// A run directory or artifact could not be created or written.
#[derive(Debug, Error)]
#[error("filesystem error at {}", path.display())]
pub struct FilesystemError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl FilesystemError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// A shell command could not be started or waited on.
///
/// Timeouts and non-zero exit codes are not execution errors.
#[derive(Debug, Error)]
#[error("failed to execute `{command}`")]
pub struct ExecutionError {
    pub command: String,
    #[source]
    pub source: std::io::Error,
}

/// Failures talking to the chat-completion API.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat request failed")]
    Network(#[source] reqwest::Error),

    #[error("chat API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not parse chat response: {0}")]
    Parse(String),

    #[error("chat response contained no message content")]
    EmptyResponse,
}
