//! One end-to-end agent session: prompt, loop, judgment, summary, manifest.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::instructions::SYSTEM_PRIMER;
use crate::core::types::Conversation;
use crate::io::chat::ChatClient;
use crate::io::config::AgentConfig;
use crate::io::prompt::PromptEngine;
use crate::io::shell::CommandRunner;
use crate::io::workspace::Workspace;
use crate::judge::{CompletionJudge, save_summary};
use crate::looping::ConversationLoop;

/// What a finished session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub run_dir: PathBuf,
    pub summary_path: PathBuf,
    pub manifest_path: PathBuf,
    /// Commands attempted across all loop runs.
    pub commands_executed: usize,
    pub loop_runs: u32,
    /// Final verdict of the completion judge.
    pub completed: bool,
}

/// Drive `task` to completion inside `workspace`.
///
/// The workspace must already exist; its absolute path is handed to the model.
#[instrument(skip_all, fields(run = %workspace.timestamp, model = %cfg.model))]
pub fn run_session<C: ChatClient, R: CommandRunner>(
    cfg: &AgentConfig,
    task: &str,
    chat: &C,
    runner: &R,
    workspace: &Workspace,
) -> Result<SessionOutcome> {
    let workspace_dir = workspace.absolute_run_dir()?;
    let shell = cfg.shell.first().map_or("sh", String::as_str);
    let task_prompt = PromptEngine::new().render_task(task, shell, &workspace_dir)?;

    let mut conversation = Conversation::primed(SYSTEM_PRIMER, task_prompt.clone());
    let mut agent = ConversationLoop::new(task_prompt, cfg.limits.clone(), cfg.stop_rule);
    let judge = CompletionJudge::new(cfg.limits.max_judge_retries);

    let verdict = judge.drive(&mut agent, &mut conversation, chat, runner)?;
    let summary = judge.summarize(&mut conversation, chat)?;
    let summary_path = save_summary(workspace, &summary)?;
    let manifest_path = workspace.save_commands_manifest(agent.executed())?;

    let outcome = SessionOutcome {
        run_dir: workspace.run_dir.clone(),
        summary_path,
        manifest_path,
        commands_executed: agent.executed().len(),
        loop_runs: verdict.runs,
        completed: verdict.completed,
    };
    info!(
        commands = outcome.commands_executed,
        runs = outcome.loop_runs,
        completed = outcome.completed,
        "session finished"
    );
    Ok(outcome)
}
