//! I/O helpers: configuration, filesystem, processes and the chat API.

pub mod chat;
pub mod config;
pub mod process;
pub mod prompt;
pub mod shell;
pub mod workspace;
