//! Agent configuration loaded from `shellpilot.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::stop::{StopRule, Thresholds};
use crate::io::shell::default_shell;

pub const DEFAULT_CONFIG_FILE: &str = "shellpilot.toml";

/// Agent configuration (TOML).
///
/// Every field is optional in the file; missing fields take the defaults
/// below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Chat model identifier sent with every request.
    pub model: String,

    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    pub api_base: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Organization id sent as `OpenAI-Organization`. `OPENAI_ORGANIZATION` is used when unset.
    pub organization: Option<String>,

    /// Client-side timeout for chat requests. `None` waits indefinitely.
    pub request_timeout_secs: Option<u64>,

    /// Directory under which per-run directories are created.
    pub workspace_dir: PathBuf,

    /// Shell program and arguments; each command is appended as the final argument.
    pub shell: Vec<String>,

    /// How the command and error thresholds combine.
    pub stop_rule: StopRule,

    pub limits: LoopLimits,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoopLimits {
    /// Wall-clock bound for a single shell command.
    pub command_timeout_secs: u64,

    /// Characters of stdout/stderr fed back to the model per command.
    pub output_char_limit: usize,

    /// Longer messages are split into several messages of this many characters.
    pub message_chunk_chars: usize,

    /// Commands that must be executed before the threshold exit can fire.
    pub min_commands: usize,

    /// Error count the threshold exit compares against.
    pub max_errors: u32,

    /// Extra loop runs granted while the judge says the task is unfinished.
    pub max_judge_retries: u32,

    /// In-memory capture bound per stream, in bytes.
    pub capture_limit_bytes: usize,
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self {
            command_timeout_secs: 60,
            output_char_limit: 8000,
            message_chunk_chars: 4000,
            min_commands: 5,
            max_errors: 3,
            max_judge_retries: 3,
            capture_limit_bytes: 1_000_000,
        }
    }
}

impl LoopLimits {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            min_commands: self.min_commands,
            max_errors: self.max_errors,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            organization: None,
            request_timeout_secs: None,
            workspace_dir: PathBuf::from("workspace"),
            shell: default_shell(),
            stop_rule: StopRule::default(),
            limits: LoopLimits::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty"));
        }
        if self.api_base.trim().is_empty() {
            return Err(anyhow!("api_base must be non-empty"));
        }
        if self.api_key_env.trim().is_empty() {
            return Err(anyhow!("api_key_env must be non-empty"));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(anyhow!("request_timeout_secs must be > 0 when set"));
        }
        if self.shell.is_empty() || self.shell[0].trim().is_empty() {
            return Err(anyhow!("shell must be a non-empty array"));
        }
        if self.limits.command_timeout_secs == 0 {
            return Err(anyhow!("limits.command_timeout_secs must be > 0"));
        }
        if self.limits.output_char_limit == 0 {
            return Err(anyhow!("limits.output_char_limit must be > 0"));
        }
        if self.limits.message_chunk_chars == 0 {
            return Err(anyhow!("limits.message_chunk_chars must be > 0"));
        }
        if self.limits.capture_limit_bytes == 0 {
            return Err(anyhow!("limits.capture_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config file missing, using defaults");
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// API credentials, read once at startup and immutable afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub organization: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("organization", &self.organization)
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env(cfg: &AgentConfig) -> Result<Self> {
        Self::resolve(cfg, |name| std::env::var(name).ok())
    }

    /// Resolve credentials with an injectable variable lookup.
    pub fn resolve<F>(cfg: &AgentConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(&cfg.api_key_env)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("{} is not set", cfg.api_key_env))?;
        let organization = cfg
            .organization
            .clone()
            .or_else(|| lookup("OPENAI_ORGANIZATION"))
            .filter(|org| !org.trim().is_empty());
        Ok(Self {
            api_key,
            organization,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn defaults_match_documented_constants() {
        let limits = LoopLimits::default();
        assert_eq!(limits.command_timeout(), Duration::from_secs(60));
        assert_eq!(limits.output_char_limit, 8000);
        assert_eq!(limits.message_chunk_chars, 4000);
        assert_eq!(limits.min_commands, 5);
        assert_eq!(limits.max_errors, 3);
        assert_eq!(limits.max_judge_retries, 3);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("shellpilot.toml");
        fs::write(
            &path,
            "model = \"gpt-4o\"\nstop_rule = \"bounded\"\n\n[limits]\ncommand_timeout_secs = 5\n",
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.model, "gpt-4o");
        assert_eq!(cfg.stop_rule, StopRule::Bounded);
        assert_eq!(cfg.limits.command_timeout_secs, 5);
        assert_eq!(cfg.limits.output_char_limit, 8000);
        assert_eq!(cfg.workspace_dir, PathBuf::from("workspace"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("shellpilot.toml");
        fs::write(&path, "shell = []\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("shell must be a non-empty array"));
    }

    #[test]
    fn credentials_require_api_key() {
        let cfg = AgentConfig::default();
        let err = Credentials::resolve(&cfg, |_| None).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY is not set"));
    }

    #[test]
    fn credentials_prefer_configured_organization() {
        let cfg = AgentConfig {
            organization: Some("org-config".to_string()),
            ..AgentConfig::default()
        };
        let creds = Credentials::resolve(&cfg, |name| match name {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "OPENAI_ORGANIZATION" => Some("org-env".to_string()),
            _ => None,
        })
        .expect("credentials");
        assert_eq!(creds.api_key, "sk-test");
        assert_eq!(creds.organization.as_deref(), Some("org-config"));
        assert!(!format!("{creds:?}").contains("sk-test"));
    }
}
