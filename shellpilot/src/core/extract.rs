//! Lenient extraction of shell commands from model replies.
//!
//! Model output is not trusted to be clean JSON. Extraction runs in two
//! stages: the whole reply as a single `{"command": ...}` object, then a scan
//! for every brace-delimited fragment mentioning `"command"`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static COMMAND_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{[^}]*"command"[^}]*\}"#).expect("command regex is valid"));

/// Result of extracting commands from a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// One or more commands, in the order they appear in the reply.
    Parsed(Vec<String>),
    /// Nothing usable was found.
    Empty,
}

impl ParseOutcome {
    pub fn into_commands(self) -> Vec<String> {
        match self {
            ParseOutcome::Parsed(commands) => commands,
            ParseOutcome::Empty => Vec::new(),
        }
    }

    fn from_commands(commands: Vec<String>) -> Self {
        if commands.is_empty() {
            ParseOutcome::Empty
        } else {
            ParseOutcome::Parsed(commands)
        }
    }
}

/// Extract commands from a raw assistant reply.
pub fn extract_commands(reply: &str) -> ParseOutcome {
    if let Some(command) = parse_command_object(reply.trim()) {
        return ParseOutcome::Parsed(vec![command]);
    }

    let commands = COMMAND_OBJECT_RE
        .find_iter(reply)
        .filter_map(|fragment| parse_command_object(fragment.as_str()))
        .collect();
    ParseOutcome::from_commands(commands)
}

/// Parse `text` as a JSON object and return its string `command` field.
fn parse_command_object(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    match value.get("command")? {
        Value::String(command) => Some(command.clone()),
        _ => None,
    }
}
