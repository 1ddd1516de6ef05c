//! Chat-completion backend abstraction.
//!
//! [`ChatClient`] takes the full ordered history and returns the text of a
//! single assistant reply. [`OpenAiChatClient`] talks to any OpenAI-compatible
//! `/chat/completions` endpoint; tests use scripted clients instead.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::core::types::Message;
use crate::error::ChatError;
use crate::io::config::{AgentConfig, Credentials};

/// Abstraction over chat-completion backends.
pub trait ChatClient {
    /// Request one reply for `messages`. Blocks until the backend answers.
    fn complete(&self, messages: &[Message]) -> Result<String>;
}

/// Blocking client for OpenAI-compatible chat-completion APIs.
pub struct OpenAiChatClient {
    client: Client,
    endpoint: String,
    model: String,
    credentials: Credentials,
}

impl OpenAiChatClient {
    pub fn new(
        api_base: &str,
        model: impl Into<String>,
        credentials: Credentials,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            model: model.into(),
            credentials,
        })
    }

    pub fn from_config(cfg: &AgentConfig, credentials: Credentials) -> Result<Self> {
        Self::new(
            &cfg.api_base,
            cfg.model.clone(),
            credentials,
            cfg.request_timeout(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ChatClient for OpenAiChatClient {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    fn complete(&self, messages: &[Message]) -> Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.credentials.api_key)
            .json(&body);
        if let Some(org) = &self.credentials.organization {
            request = request.header("OpenAI-Organization", org);
        }

        debug!("sending chat completion request");
        let response = request
            .send()
            .map_err(ChatError::Network)?;

        let status = response.status();
        let text = response
            .text()
            .map_err(ChatError::Network)?;
        if !status.is_success() {
            return Err(ChatError::Api {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        let reply = parse_completion(&text)?;
        debug!(chars = reply.chars().count(), "received chat completion");
        Ok(reply)
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Extract `choices[0].message.content` from a response body.
pub fn parse_completion(body: &str) -> Result<String, ChatError> {
    let response: CompletionResponse =
        serde_json::from_str(body).map_err(|err| ChatError::Parse(err.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(ChatError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_wire_format() {
        let messages = vec![Message::system("rules"), Message::user("task")];
        let body = CompletionRequest {
            model: "gpt-4",
            messages: &messages,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-4",
                "messages": [
                    {"role": "system", "content": "rules"},
                    {"role": "user", "content": "task"}
                ]
            })
        );
    }

    #[test]
    fn parses_first_choice_content() {
        let body = r#"{"id":"c1","choices":[{"index":0,"message":{"role":"assistant","content":"{\"command\": \"ls\"}"},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_completion(body).expect("parse"), r#"{"command": "ls"}"#);
    }

    #[test]
    fn missing_content_is_empty_response() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert!(matches!(parse_completion(body), Err(ChatError::EmptyResponse)));
        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#),
            Err(ChatError::EmptyResponse)
        ));
    }

    #[test]
    fn malformed_body_is_parse_error() {
        assert!(matches!(parse_completion("<html>"), Err(ChatError::Parse(_))));
    }

    #[test]
    fn network_failure_keeps_underlying_cause() {
        let creds = Credentials {
            api_key: "sk-test".to_string(),
            organization: None,
        };
        let client = OpenAiChatClient::new(
            "http://127.0.0.1:1/v1",
            "gpt-4",
            creds,
            Some(Duration::from_secs(5)),
        )
        .expect("client");

        let err = client.complete(&[Message::user("hi")]).unwrap_err();
        let chat_err = err.downcast_ref::<ChatError>().expect("chat error");
        assert!(matches!(chat_err, ChatError::Network(_)));
        assert!(std::error::Error::source(chat_err).is_some());
        assert!(err.chain().count() > 1);
    }

    #[test]
    fn endpoint_joins_base_url() {
        let creds = Credentials {
            api_key: "sk-test".to_string(),
            organization: None,
        };
        let client = OpenAiChatClient::new("http://localhost:8080/v1/", "gpt-4", creds, None)
            .expect("client");
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
