//! Minimal shell-command agent driven by a chat-completion model.
//!
//! The model is asked for shell commands as JSON objects; each command is run
//! in a per-run workspace and its output is fed back until the model reports
//! completion. A judge step may re-run the loop, and a final summary is saved
//! next to a manifest of every command executed.
//!
//! - **[`core`]**: Pure logic (message history, reply parsing, stop rules).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side effects (config, chat API, shell processes, workspace files),
//!   behind traits so tests can script them.
//!
//! [`looping`], [`judge`] and [`session`] coordinate the two.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod judge;
pub mod logging;
pub mod looping;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
