//! Shared deterministic types for the conversation loop.
//!
//! These types define stable contracts between the loop, the judge and the
//! chat backend. They do not depend on external state or I/O.

use serde::{Deserialize, Serialize};

use crate::core::text::chunk_chars;

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Append-only message history shared by the loop and the judge.
///
/// Messages are never reordered, removed or deduplicated. Every consumer works
/// on the same instance through `&mut`, so all of them observe the same
/// growing history.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with a system instruction followed by the task prompt.
    pub fn primed(system: impl Into<String>, task: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.push(Message::system(system));
        conversation.push(Message::user(task));
        conversation
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append `content` split into messages of at most `max_chars` characters.
    ///
    /// Empty content appends nothing.
    pub fn push_chunked(&mut self, role: Role, content: &str, max_chars: usize) {
        for chunk in chunk_chars(content, max_chars) {
            self.messages.push(Message::new(role, chunk));
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Captured output of a shell command that ran to completion.
///
/// A non-zero exit code still counts as completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    #[serde(skip)]
    pub exit_code: Option<i32>,
}

/// Result of running one shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Completed(CapturedOutput),
    /// The command exceeded its wall-clock bound and was abandoned.
    TimedOut,
}

impl ExecutionResult {
    pub fn output(&self) -> Option<&CapturedOutput> {
        match self {
            ExecutionResult::Completed(output) => Some(output),
            ExecutionResult::TimedOut => None,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, ExecutionResult::TimedOut)
    }
}

/// A command the loop attempted, paired with what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedCommand {
    pub command: String,
    pub result: ExecutionResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primed_conversation_starts_with_system_then_user() {
        let conversation = Conversation::primed("rules", "do the thing");
        let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);
        assert_eq!(conversation.messages()[1].content, "do the thing");
    }

    #[test]
    fn push_chunked_splits_on_character_boundaries() {
        let mut conversation = Conversation::new();
        conversation.push_chunked(Role::System, "ééééé", 2);
        let contents: Vec<&str> = conversation
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["éé", "éé", "é"]);
        assert!(conversation.messages().iter().all(|m| m.role == Role::System));
    }

    #[test]
    fn push_chunked_with_empty_content_appends_nothing() {
        let mut conversation = Conversation::new();
        conversation.push_chunked(Role::User, "", 4000);
        assert!(conversation.is_empty());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).expect("serialize");
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
