//! Shell-command agent.
//!
//! Asks a chat model for shell commands, runs them in a timestamped workspace
//! directory and saves a summary plus a manifest of executed commands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use shellpilot::exit_codes;
use shellpilot::io::chat::OpenAiChatClient;
use shellpilot::io::config::{Credentials, DEFAULT_CONFIG_FILE, load_config};
use shellpilot::io::prompt::DEFAULT_TASK;
use shellpilot::io::shell::ShellCommandRunner;
use shellpilot::io::workspace::Workspace;
use shellpilot::logging;
use shellpilot::session::run_session;

#[derive(Parser)]
#[command(
    name = "shellpilot",
    version,
    about = "Let a chat model drive a shell until a task is done"
)]
struct Cli {
    /// Path to the TOML config. Defaults apply when the file is missing.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Task text. The built-in demo task runs when neither this nor `--task-file` is set.
    #[arg(long, conflicts_with = "task_file")]
    task: Option<String>,
    /// Read the task text from a file.
    #[arg(long)]
    task_file: Option<PathBuf>,
    /// Base directory for run directories; overrides `workspace_dir`.
    #[arg(long)]
    workspace: Option<PathBuf>,
}

fn main() {
    logging::init();
    let result = run(Cli::parse());
    if let Err(err) = &result {
        eprintln!("{err:#}");
    }
    std::process::exit(exit_code(&result));
}

fn exit_code(result: &Result<()>) -> i32 {
    match result {
        Ok(()) => exit_codes::OK,
        Err(_) => exit_codes::FAILED,
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut cfg = load_config(&cli.config)?;
    if let Some(dir) = cli.workspace {
        cfg.workspace_dir = dir;
    }
    let task = resolve_task(cli.task, cli.task_file.as_deref())?;

    let credentials = Credentials::from_env(&cfg)?;
    let chat = OpenAiChatClient::from_config(&cfg, credentials)?;
    let workspace = Workspace::create(&cfg.workspace_dir)?;
    let runner = ShellCommandRunner::new(
        cfg.shell.clone(),
        cfg.limits.command_timeout(),
        cfg.limits.capture_limit_bytes,
    )
    .with_workdir(&workspace.run_dir);

    let outcome = run_session(&cfg, &task, &chat, &runner, &workspace)?;
    println!("{}", outcome.summary_path.display());
    Ok(())
}

fn resolve_task(task: Option<String>, task_file: Option<&Path>) -> Result<String> {
    match (task, task_file) {
        (Some(task), _) => Ok(task),
        (None, Some(path)) => {
            fs::read_to_string(path).with_context(|| format!("read task file {}", path.display()))
        }
        (None, None) => Ok(DEFAULT_TASK.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_without_flags_uses_defaults() {
        let cli = Cli::parse_from(["shellpilot"]);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert!(cli.task.is_none());
        assert!(cli.task_file.is_none());
        assert!(cli.workspace.is_none());
    }

    #[test]
    fn parse_task_and_workspace() {
        let cli = Cli::parse_from(["shellpilot", "--task", "ls", "--workspace", "/tmp/ws"]);
        assert_eq!(cli.task.as_deref(), Some("ls"));
        assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/ws")));
    }

    #[test]
    fn task_and_task_file_conflict() {
        let result = Cli::try_parse_from(["shellpilot", "--task", "ls", "--task-file", "t.md"]);
        assert!(result.is_err());
    }

    #[test]
    fn exit_code_reflects_run_result() {
        assert_eq!(exit_code(&Ok(())), exit_codes::OK);
        assert_eq!(exit_code(&Err(anyhow::anyhow!("boom"))), exit_codes::FAILED);
    }

    #[test]
    fn task_resolution_falls_back_to_default() {
        assert_eq!(resolve_task(None, None).expect("task"), DEFAULT_TASK);
        assert_eq!(resolve_task(Some("x".to_string()), None).expect("task"), "x");
    }

    #[test]
    fn task_file_is_read() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("task.md");
        fs::write(&path, "Make a file.").expect("write");
        assert_eq!(resolve_task(None, Some(&path)).expect("task"), "Make a file.");
        assert!(resolve_task(None, Some(&temp.path().join("missing.md"))).is_err());
    }
}
