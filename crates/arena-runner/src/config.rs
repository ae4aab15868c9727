//! Runner configuration.
//!
//! Loaded from a TOML file (`arena.toml` by default), then overridden by
//! environment variables:
//!
//! | Variable               | Field             |
//! |------------------------|-------------------|
//! | `ARENA_MODEL_URL`      | `model.url`       |
//! | `ARENA_MODEL_API_KEY`  | `model.api_key`   |
//! | `ARENA_SEARCH_URL`     | `search.url`      |
//! | `ARENA_SEARCH_API_KEY` | `search.api_key`  |
//! | `ARENA_STATE_DIR`      | `state_dir`       |

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use arena_core::{DebateConfig, JudgeConfig};
use serde::Deserialize;

/// Default chat-completions endpoint (local OpenAI-compatible server).
pub const DEFAULT_MODEL_URL: &str = "http://localhost:8000/v1/chat/completions";
pub const DEFAULT_STATE_DIR: &str = ".arena";

/// One HTTP endpoint plus its call policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Retries after the first attempt, transient failures only.
    pub max_retries: u32,
    /// Base delay of the exponential backoff.
    pub backoff_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_MODEL_URL.to_string(),
            api_key: None,
            timeout_secs: 120,
            max_retries: 3,
            backoff_ms: 500,
        }
    }
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Top-level runner configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Chat-completions endpoint used for every model call.
    pub model: EndpointConfig,
    /// Evidence search endpoint; verification finds nothing when unset.
    pub search: Option<EndpointConfig>,
    pub state_dir: PathBuf,
    /// Debates run at once by `arena run`.
    pub concurrency: usize,
    pub judge: Option<JudgeConfig>,
    #[serde(rename = "debate")]
    pub debates: Vec<DebateConfig>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            model: EndpointConfig::default(),
            search: None,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            concurrency: 2,
            judge: None,
            debates: Vec::new(),
        }
    }
}

impl RunnerConfig {
    /// Load from `path` if it exists, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
            .context(format!("Failed to parse runner config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RunnerConfig = toml::from_str(content).context("Invalid runner TOML")?;
        Ok(config)
    }

    /// Apply `ARENA_*` overrides from `lookup` (normally the process env).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ARENA_MODEL_URL") {
            self.model.url = url;
        }
        if let Some(key) = lookup("ARENA_MODEL_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(url) = lookup("ARENA_SEARCH_URL") {
            self.search.get_or_insert_with(EndpointConfig::default).url = url;
        }
        if let Some(key) = lookup("ARENA_SEARCH_API_KEY") {
            if let Some(search) = self.search.as_mut() {
                search.api_key = Some(key);
            }
        }
        if let Some(dir) = lookup("ARENA_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }
    }

    /// Validate every `[[debate]]` entry. Only `arena run` needs them.
    pub fn validate_debates(&self) -> Result<()> {
        for (i, debate) in self.debates.iter().enumerate() {
            debate
                .validate()
                .context(format!("debate #{} ({:?}) is invalid", i + 1, debate.motion))?;
        }
        Ok(())
    }

    pub fn validate_judge(&self) -> Result<()> {
        if let Some(judge) = &self.judge {
            judge.validate().context("judge section is invalid")?;
        }
        Ok(())
    }
}
