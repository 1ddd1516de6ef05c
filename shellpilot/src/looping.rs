//! The request → extract → execute → append cycle.

use std::collections::VecDeque;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::extract::{ParseOutcome, extract_commands};
use crate::core::instructions::{
    COMPLETION_CHECK, COMPLETION_PHRASE, FORMAT_REMINDER, NO_OUTPUT, STDERR_PREFIX, STDOUT_PREFIX,
    TIMEOUT_NOTICE,
};
use crate::core::stop::{LoopProgress, StopRule};
use crate::core::text::{contains_ignore_case, truncate_chars};
use crate::core::types::{
    CapturedOutput, Conversation, ExecutedCommand, ExecutionResult, Message, Role,
};
use crate::io::chat::ChatClient;
use crate::io::config::LoopLimits;
use crate::io::shell::CommandRunner;

/// Reason why [`ConversationLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStop {
    /// A reply contained the completion phrase.
    TaskCompleted,
    /// The stop rule's thresholds were met.
    ThresholdReached,
}

/// Summary of one loop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOutcome {
    pub stop: LoopStop,
    /// Replies without an extractable command during this run.
    pub errors: u32,
    /// Commands attempted during this run.
    pub commands_run: usize,
}

#[derive(Debug)]
enum LoopState {
    AwaitingModelResponse,
    NoCommandsExtracted { reply: String },
    HaveCommands { reply: String, commands: Vec<String> },
    Executing { pending: VecDeque<String> },
    Done(LoopStop),
}

/// Drives the model through shell commands for one task.
///
/// Executed commands accumulate across runs; the error counter starts from
/// zero on every run.
#[derive(Debug)]
pub struct ConversationLoop {
    task_prompt: String,
    limits: LoopLimits,
    stop_rule: StopRule,
    executed: Vec<ExecutedCommand>,
}

impl ConversationLoop {
    pub fn new(task_prompt: impl Into<String>, limits: LoopLimits, stop_rule: StopRule) -> Self {
        Self {
            task_prompt: task_prompt.into(),
            limits,
            stop_rule,
            executed: Vec::new(),
        }
    }

    /// Every command attempted so far, in order, with its result.
    pub fn executed(&self) -> &[ExecutedCommand] {
        &self.executed
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.executed.iter().map(|entry| entry.command.as_str())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.executed.iter().map(|entry| &entry.result)
    }

    /// Run the loop until the completion phrase appears or the stop rule says stop.
    ///
    /// Chat and execution failures propagate; unusable replies and timeouts
    /// are answered with corrective messages instead.
    #[instrument(skip_all, fields(stop_rule = ?self.stop_rule, executed = self.executed.len()))]
    pub fn run<C: ChatClient, R: CommandRunner>(
        &mut self,
        conversation: &mut Conversation,
        chat: &C,
        runner: &R,
    ) -> Result<LoopOutcome> {
        let mut errors = 0u32;
        let started_with = self.executed.len();
        let mut state = LoopState::AwaitingModelResponse;

        loop {
            state = match state {
                LoopState::AwaitingModelResponse => {
                    self.await_reply(conversation, chat, errors)?
                }
                LoopState::NoCommandsExtracted { reply } => {
                    errors += 1;
                    info!(errors, "assistant response is not in JSON format, skipping");
                    conversation.push(Message::system(reply));
                    conversation.push(Message::user(self.task_prompt.clone()));
                    conversation.push(Message::user(FORMAT_REMINDER));
                    LoopState::AwaitingModelResponse
                }
                LoopState::HaveCommands { reply, commands } => {
                    conversation.push(Message::system(reply));
                    LoopState::Executing {
                        pending: commands.into(),
                    }
                }
                LoopState::Executing { mut pending } => match pending.pop_front() {
                    Some(command) => {
                        self.execute(conversation, runner, command)?;
                        LoopState::Executing { pending }
                    }
                    None => LoopState::AwaitingModelResponse,
                },
                LoopState::Done(stop) => {
                    let outcome = LoopOutcome {
                        stop,
                        errors,
                        commands_run: self.executed.len() - started_with,
                    };
                    info!(
                        stop = ?outcome.stop,
                        errors,
                        commands_run = outcome.commands_run,
                        "loop finished"
                    );
                    return Ok(outcome);
                }
            };
        }
    }

    fn await_reply<C: ChatClient>(
        &self,
        conversation: &Conversation,
        chat: &C,
        errors: u32,
    ) -> Result<LoopState> {
        let progress = LoopProgress {
            executed: self.executed.len(),
            errors,
        };
        if !self
            .stop_rule
            .should_continue(progress, self.limits.thresholds())
        {
            debug!(?progress, "thresholds reached");
            return Ok(LoopState::Done(LoopStop::ThresholdReached));
        }

        let reply = chat
            .complete(conversation.messages())
            .context("request command from model")?;
        info!(response = %reply, "assistant response");

        if contains_ignore_case(&reply, COMPLETION_PHRASE) {
            return Ok(LoopState::Done(LoopStop::TaskCompleted));
        }

        match extract_commands(&reply) {
            ParseOutcome::Parsed(commands) => {
                info!(count = commands.len(), "commands extracted from assistant response");
                Ok(LoopState::HaveCommands { reply, commands })
            }
            ParseOutcome::Empty => Ok(LoopState::NoCommandsExtracted { reply }),
        }
    }

    fn execute<R: CommandRunner>(
        &mut self,
        conversation: &mut Conversation,
        runner: &R,
        command: String,
    ) -> Result<()> {
        info!(command = %command, "executing command");
        let result = runner.run(&command)?;
        let chunk = self.limits.message_chunk_chars;

        match &result {
            ExecutionResult::TimedOut => {
                conversation.push_chunked(Role::User, TIMEOUT_NOTICE, chunk);
                conversation.push_chunked(Role::User, FORMAT_REMINDER, chunk);
            }
            ExecutionResult::Completed(output) => {
                info!(
                    stdout = %output.stdout,
                    stderr = %output.stderr,
                    exit_code = ?output.exit_code,
                    "output"
                );
                self.feed_back(conversation, output);
                conversation.push_chunked(Role::User, COMPLETION_CHECK, chunk);
            }
        }

        self.executed.push(ExecutedCommand { command, result });
        Ok(())
    }

    fn feed_back(&self, conversation: &mut Conversation, output: &CapturedOutput) {
        let limit = self.limits.output_char_limit;
        let chunk = self.limits.message_chunk_chars;

        if output.stdout.is_empty() {
            conversation.push_chunked(Role::System, NO_OUTPUT, chunk);
        } else {
            let stdout = format!("{STDOUT_PREFIX}{}", truncate_chars(&output.stdout, limit));
            conversation.push_chunked(Role::System, &stdout, chunk);
        }

        if !output.stderr.is_empty() {
            let stderr = format!("{STDERR_PREFIX}{}", truncate_chars(&output.stderr, limit));
            conversation.push_chunked(Role::System, &stderr, chunk);
        }
    }
}
