//! Model invocation interface.
//!
//! The core never talks HTTP. Every generation, extraction, verdict and
//! judge call goes through [`ModelClient::generate`], which owns its own
//! timeout and retry policy and either returns a [`Completion`] or fails
//! with a [`GenerationError`].

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a conversation sent to a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Which model to call and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identity, e.g. `"gpt-4o"`. Two sides may not share one.
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Raw model output plus token usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            input_tokens: 0,
            output_tokens: 0,
        }
    }
}

/// The model-invocation collaborator.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run one conversation against `config.model`.
    async fn generate(
        &self,
        conversation: &[ChatMessage],
        config: &ModelConfig,
    ) -> Result<Completion, GenerationError>;
}

/// What a model call was made for; used for usage accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPurpose {
    Turn,
    Extraction,
    Verdict,
    Judge,
}

impl fmt::Display for CallPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Turn => write!(f, "turn"),
            Self::Extraction => write!(f, "extraction"),
            Self::Verdict => write!(f, "verdict"),
            Self::Judge => write!(f, "judge"),
        }
    }
}

/// Accumulated token usage for one purpose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurposeUsage {
    pub calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Token usage totals for a debate, broken down by purpose.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub by_purpose: BTreeMap<CallPurpose, PurposeUsage>,
}

impl UsageTotals {
    pub fn record(&mut self, purpose: CallPurpose, completion: &Completion) {
        let entry = self.by_purpose.entry(purpose).or_default();
        entry.calls += 1;
        entry.input_tokens += u64::from(completion.input_tokens);
        entry.output_tokens += u64::from(completion.output_tokens);
    }

    pub fn calls(&self) -> u32 {
        self.by_purpose.values().map(|u| u.calls).sum()
    }

    pub fn input_tokens(&self) -> u64 {
        self.by_purpose.values().map(|u| u.input_tokens).sum()
    }

    pub fn output_tokens(&self) -> u64 {
        self.by_purpose.values().map(|u| u.output_tokens).sum()
    }

    pub fn calls_for(&self, purpose: CallPurpose) -> u32 {
        self.by_purpose.get(&purpose).map_or(0, |u| u.calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_totals_accumulate_by_purpose() {
        let mut usage = UsageTotals::default();
        let completion = Completion {
            text: "x".into(),
            input_tokens: 100,
            output_tokens: 40,
        };
        usage.record(CallPurpose::Turn, &completion);
        usage.record(CallPurpose::Turn, &completion);
        usage.record(CallPurpose::Verdict, &completion);

        assert_eq!(usage.calls(), 3);
        assert_eq!(usage.calls_for(CallPurpose::Turn), 2);
        assert_eq!(usage.calls_for(CallPurpose::Judge), 0);
        assert_eq!(usage.input_tokens(), 300);
        assert_eq!(usage.output_tokens(), 120);
    }

    #[test]
    fn chat_role_serde() {
        let json = serde_json::to_string(&ChatRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn model_config_defaults_from_json() {
        let cfg: ModelConfig = serde_json::from_str(r#"{"model":"m-1"}"#).unwrap();
        assert_eq!(cfg.model, "m-1");
        assert_eq!(cfg.max_tokens, 2048);
    }
}
