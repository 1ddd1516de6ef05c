//! Completion judgment, loop re-runs and the closing summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::instructions::{JUDGE_AFFIRMATIVE, JUDGE_QUESTION, SUMMARY_REQUEST};
use crate::core::text::contains_ignore_case;
use crate::core::types::{Conversation, Message};
use crate::io::chat::ChatClient;
use crate::io::shell::CommandRunner;
use crate::io::workspace::{OUTPUTS_DIR, SUMMARY_FILE, Workspace};
use crate::looping::ConversationLoop;

/// Result of [`CompletionJudge::drive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JudgeOutcome {
    /// Loop runs, including the first.
    pub runs: u32,
    /// Final verdict of the judge.
    pub completed: bool,
}

/// Asks the model whether the task is done and re-runs the loop when it is not.
#[derive(Debug, Clone, Copy)]
pub struct CompletionJudge {
    max_retries: u32,
}

impl CompletionJudge {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Append the judgment request, ask once and keep the verdict in the history.
    pub fn decide_completed<C: ChatClient>(
        &self,
        conversation: &mut Conversation,
        chat: &C,
    ) -> Result<bool> {
        conversation.push(Message::system(JUDGE_QUESTION));
        let reply = chat
            .complete(conversation.messages())
            .context("request completion verdict")?;
        let completed = contains_ignore_case(&reply, JUDGE_AFFIRMATIVE);
        info!(response = %reply, completed, "judge decision");
        conversation.push(Message::assistant(reply));
        Ok(completed)
    }

    /// Run the loop, then re-run it until the judge agrees or retries run out.
    #[instrument(skip_all, fields(max_retries = self.max_retries))]
    pub fn drive<C: ChatClient, R: CommandRunner>(
        &self,
        agent: &mut ConversationLoop,
        conversation: &mut Conversation,
        chat: &C,
        runner: &R,
    ) -> Result<JudgeOutcome> {
        agent.run(conversation, chat, runner)?;
        let mut runs = 1;
        let mut reruns = 0;

        let completed = loop {
            if self.decide_completed(conversation, chat)? {
                break true;
            }
            if reruns >= self.max_retries {
                break false;
            }
            reruns += 1;
            info!(rerun = reruns, "task not completed, running loop again");
            agent.run(conversation, chat, runner)?;
            runs += 1;
        };

        Ok(JudgeOutcome { runs, completed })
    }

    /// Ask the model for a markdown summary of the session.
    pub fn summarize<C: ChatClient>(
        &self,
        conversation: &mut Conversation,
        chat: &C,
    ) -> Result<String> {
        conversation.push(Message::system(SUMMARY_REQUEST));
        chat.complete(conversation.messages()).context("request summary")
    }
}

/// Persist the summary as `outputs/summary.md`.
pub fn save_summary(workspace: &Workspace, summary: &str) -> Result<PathBuf> {
    let path = workspace.save_file(SUMMARY_FILE, summary, Some(OUTPUTS_DIR))?;
    info!(path = %path.display(), "summary saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instructions::SYSTEM_PRIMER;
    use crate::core::stop::StopRule;
    use crate::core::types::Role;
    use crate::io::config::LoopLimits;
    use crate::test_support::{ScriptedChat, ScriptedRunner, TestWorkspace};

    fn setup() -> (Conversation, ConversationLoop) {
        (
            Conversation::primed(SYSTEM_PRIMER, "task"),
            ConversationLoop::new("task", LoopLimits::default(), StopRule::Literal),
        )
    }

    #[test]
    fn verdict_is_case_insensitive_and_recorded() {
        let chat = ScriptedChat::new(["YES, it is."]);
        let mut conv = Conversation::primed(SYSTEM_PRIMER, "task");

        let done = CompletionJudge::new(3)
            .decide_completed(&mut conv, &chat)
            .expect("decide");

        assert!(done);
        let tail: Vec<(Role, &str)> = conv.messages()[2..]
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            tail,
            vec![(Role::System, JUDGE_QUESTION), (Role::Assistant, "YES, it is.")]
        );
    }

    #[test]
    fn no_verdict_is_not_completed() {
        let chat = ScriptedChat::new(["No."]);
        let mut conv = Conversation::new();
        assert!(
            !CompletionJudge::new(3)
                .decide_completed(&mut conv, &chat)
                .expect("decide")
        );
    }

    #[test]
    fn affirmative_first_verdict_runs_once() {
        let chat = ScriptedChat::new(["task completed", "Yes"]);
        let runner = ScriptedRunner::new(Vec::new());
        let (mut conv, mut agent) = setup();

        let outcome = CompletionJudge::new(3)
            .drive(&mut agent, &mut conv, &chat, &runner)
            .expect("drive");

        assert_eq!(outcome, JudgeOutcome { runs: 1, completed: true });
        assert_eq!(chat.remaining(), 0);
    }

    #[test]
    fn negative_verdicts_rerun_until_retries_exhausted() {
        let chat = ScriptedChat::new([
            "task completed",
            "No",
            "task completed",
            "No",
            "task completed",
            "No",
            "task completed",
            "No",
        ]);
        let runner = ScriptedRunner::new(Vec::new());
        let (mut conv, mut agent) = setup();

        let outcome = CompletionJudge::new(3)
            .drive(&mut agent, &mut conv, &chat, &runner)
            .expect("drive");

        assert_eq!(outcome, JudgeOutcome { runs: 4, completed: false });
        assert_eq!(chat.request_count(), 8);
    }

    #[test]
    fn rerun_stops_once_judge_agrees() {
        let chat = ScriptedChat::new(["task completed", "no", "task completed", "yes"]);
        let runner = ScriptedRunner::new(Vec::new());
        let (mut conv, mut agent) = setup();

        let outcome = CompletionJudge::new(3)
            .drive(&mut agent, &mut conv, &chat, &runner)
            .expect("drive");

        assert_eq!(outcome, JudgeOutcome { runs: 2, completed: true });
    }

    #[test]
    fn summary_is_requested_and_saved() {
        let chat = ScriptedChat::new(["# Result\n\nDone."]);
        let mut conv = Conversation::primed(SYSTEM_PRIMER, "task");
        let summary = CompletionJudge::new(3)
            .summarize(&mut conv, &chat)
            .expect("summarize");
        assert_eq!(conv.last().map(|m| m.content.as_str()), Some(SUMMARY_REQUEST));

        let ws = TestWorkspace::new().expect("workspace");
        let path = save_summary(&ws.workspace, &summary).expect("save");
        assert!(path.ends_with("outputs/summary.md"));
        assert_eq!(ws.read_output(SUMMARY_FILE).expect("read"), "# Result\n\nDone.");
    }
}
