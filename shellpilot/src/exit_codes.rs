//! Process exit codes for the `shellpilot` binary.

/// Session finished, whatever the judge decided.
pub const OK: i32 = 0;
/// Configuration, credentials, chat, filesystem or process failure.
pub const FAILED: i32 = 1;
